//! 3d 目标检测评估：NMS 后处理 + 流式 AP/AR 统计。
//!
//! 典型用法：外部驱动逐批调用 extract::parse_predictions / parse_groundtruths，
//! 把逐样本列表喂给 APCalculator::step，跑完整个评估集后调一次
//! compute_metrics 取各类 AP、mAP、AR。
//! 多个 IoU 阈值 × 可见性分箱的组合用 APCalculatorGrid 并行维护。

pub mod data;

pub mod extract;

pub mod geometry;

pub mod nms;

mod error;

pub use error::EvalError;

use std::cmp::Reverse;
use std::collections::{BTreeMap, HashMap, HashSet};

use itertools::Itertools;
use ordered_float::OrderedFloat;
use tracing::debug;

use crate::data::output::{ClassMetrics, Metrics};
use crate::data::{GroundTruthBox, ScoredBox};

/// 单个类别跨样本累计的匹配记录
#[derive(Clone, Default)]
struct ClassRecord {
    /// 按 step 顺序累计的 (置信度, 是否命中) 对
    hits: Vec<(OrderedFloat<f32>, bool)>,
    /// sample_index -> 该样本中该类别的真值框数。记录与预测无关（允许零预测的
    /// 类别），只在 compute_metrics 求 recall 分母时汇总
    gt_per_sample: HashMap<usize, usize>,
}

impl ClassRecord {
    /// 真值框总数，recall 的分母
    fn npos(&self) -> usize {
        self.gt_per_sample.values().sum()
    }
}

/// 流式 Average Precision 统计器
///
/// 每个 (IoU 阈值 × 可见性分箱) 组合建一个实例，生命周期覆盖一轮评估：
/// 逐批 step，最后 compute_metrics。内部状态只增不改，由本结构独占，
/// 调用方只能通过 step / compute_metrics 访问。
///
/// 并发：step 取 &mut self，借用规则即单写者约束；多 worker 并发投喂时
/// 需要外部加锁或经由单个持有者任务串行化。compute_metrics 取 &self，
/// 要求所有 step 已经结束（静止状态），重复调用结果逐位一致。
pub struct APCalculator {
    ap_iou_thresh: f32,
    /// 匹配用旧式「相交 / 真值体积」重叠而不是 3d IoU
    use_old_type_overlap: bool,
    class2type: Option<HashMap<usize, String>>,
    records: HashMap<usize, ClassRecord>,
    /// 已被更高分预测认领的真值：(class_id, sample_index, gt_index)。
    /// 认领在 step 时完成，每个真值至多被认领一次
    claimed: HashSet<(usize, usize, usize)>,
    /// 全局递增的样本序号
    scan_cnt: usize,
}

impl APCalculator {
    pub fn new(
        ap_iou_thresh: f32,
        class2type: Option<HashMap<usize, String>>,
        use_old_type_overlap: bool,
    ) -> Result<Self, EvalError> {
        if !(0f32..1f32).contains(&ap_iou_thresh) {
            return Err(EvalError::InvalidIouThreshold(ap_iou_thresh));
        }
        Ok(Self {
            ap_iou_thresh,
            use_old_type_overlap,
            class2type,
            records: HashMap::new(),
            claimed: HashSet::new(),
            scan_cnt: 0,
        })
    }

    pub fn ap_iou_thresh(&self) -> f32 {
        self.ap_iou_thresh
    }

    /// 累计一个 batch：两个序列按样本一一对齐，长度必须相等。
    /// 每个样本领取下一个全局样本序号后独立完成匹配，样本间无交互。
    pub fn step(
        &mut self,
        batch_preds: &[Vec<ScoredBox>],
        batch_gts: &[Vec<GroundTruthBox>],
    ) -> Result<(), EvalError> {
        if batch_preds.len() != batch_gts.len() {
            return Err(EvalError::BatchSizeMismatch {
                predictions: batch_preds.len(),
                groundtruths: batch_gts.len(),
            });
        }
        for (preds, gts) in batch_preds.iter().zip(batch_gts) {
            let sample_idx = self.scan_cnt;
            self.scan_cnt += 1;
            self.step_sample(sample_idx, preds, gts);
        }
        Ok(())
    }

    fn step_sample(&mut self, sample_idx: usize, preds: &[ScoredBox], gts: &[GroundTruthBox]) {
        // 真值计数先记，某类可以一条预测都没有
        for gt in gts {
            let record = self.records.entry(gt.class_id).or_default();
            *record.gt_per_sample.entry(sample_idx).or_insert(0) += 1;
        }

        // 同类 (预测, 真值) 两两重叠，一次算好
        let pred_corners: Vec<_> = preds.iter().map(|p| p.bbox_3d.to_CornerPoints()).collect();
        let gt_corners: Vec<_> = gts.iter().map(|g| g.bbox_3d.to_CornerPoints()).collect();
        let mut overlap = vec![vec![0f32; gts.len()]; preds.len()];
        for ((pred_i, pred), (gt_j, gt)) in preds
            .iter()
            .enumerate()
            .cartesian_product(gts.iter().enumerate())
        {
            if pred.class_id != gt.class_id {
                continue;
            }
            overlap[pred_i][gt_j] = if self.use_old_type_overlap {
                geometry::overlap3d_old_type(&pred_corners[pred_i], &gt_corners[gt_j])
            } else {
                geometry::iou3d(&pred_corners[pred_i], &gt_corners[gt_j]).0
            };
        }

        // 分数降序（相同分保持原顺序）贪心认领：最高分的预测先挑
        let mut order: Vec<usize> = (0..preds.len()).collect();
        order.sort_by_key(|&i| Reverse(OrderedFloat(preds[i].score)));

        for &pred_i in &order {
            let pred = &preds[pred_i];
            let best = gts
                .iter()
                .enumerate()
                .filter(|(gt_j, gt)| {
                    gt.class_id == pred.class_id
                        && !self.claimed.contains(&(pred.class_id, sample_idx, *gt_j))
                })
                .map(|(gt_j, _)| (OrderedFloat(overlap[pred_i][gt_j]), gt_j))
                .max();
            let is_tp = match best {
                Some((best_overlap, gt_j)) if best_overlap.0 >= self.ap_iou_thresh => {
                    self.claimed.insert((pred.class_id, sample_idx, gt_j));
                    true
                }
                _ => false,
            };
            self.records
                .entry(pred.class_id)
                .or_default()
                .hits
                .push((OrderedFloat(pred.score), is_tp));
        }

        debug!(
            sample = sample_idx,
            num_pred = preds.len(),
            num_gt = gts.len(),
            "accumulated sample"
        );
    }

    /// 由累计状态算出最终指标，纯函数、幂等，可重复调用。
    ///
    /// 每类：按分数降序累计 TP/FP，precision\[k\] = tp/(k+1)，
    /// recall\[k\] = tp/npos（npos 为 0 时 recall 记 0）。
    /// AP 取 11 点插值；没有真值的类别 AP/AR 记 0 且不参与 mAP/AR 求均。
    pub fn compute_metrics(&self) -> Metrics {
        let mut per_class = BTreeMap::new();
        for (&class_id, record) in &self.records {
            let npos = record.npos();
            let mut hits = record.hits.clone();
            hits.sort_by_key(|&(score, _)| Reverse(score));

            let mut tp_cum = 0usize;
            let (mut precision, mut recall) = (Vec::new(), Vec::new());
            for (rank, &(_, is_tp)) in hits.iter().enumerate() {
                if is_tp {
                    tp_cum += 1;
                }
                precision.push(tp_cum as f32 / (rank + 1) as f32);
                recall.push(if npos == 0 {
                    0f32
                } else {
                    tp_cum as f32 / npos as f32
                });
            }

            let ap = if npos == 0 {
                0f32
            } else {
                voc_ap(&recall, &precision)
            };
            let ar = recall.last().copied().unwrap_or(0f32);
            per_class.insert(class_id, ClassMetrics { ap, ar, num_gt: npos });
        }

        let evaluated: Vec<&ClassMetrics> =
            per_class.values().filter(|m| m.num_gt > 0).collect();
        let (mean_ap, mean_ar) = if evaluated.is_empty() {
            (0f32, 0f32)
        } else {
            let n = evaluated.len() as f32;
            (
                evaluated.iter().map(|m| m.ap).sum::<f32>() / n,
                evaluated.iter().map(|m| m.ar).sum::<f32>() / n,
            )
        };

        Metrics {
            per_class,
            mean_ap,
            mean_ar,
        }
    }

    /// compute_metrics 的展平版本，键用构造时传入的类别名
    pub fn compute_metrics_map(&self) -> BTreeMap<String, f32> {
        self.compute_metrics().flatten(self.class2type.as_ref())
    }
}

/// 11 点插值 VOC AP：r ∈ {0.0, 0.1, ..., 1.0} 上取 recall ≥ r 处的最大
/// precision 的平均；最后一个记录点之后 precision 按 0 处理
fn voc_ap(recall: &[f32], precision: &[f32]) -> f32 {
    let mut ap = 0f32;
    for level in 0..=10 {
        let r = level as f32 / 10f32;
        let p_max = recall
            .iter()
            .zip(precision)
            .filter(|(&rec, _)| rec >= r)
            .map(|(_, &prec)| OrderedFloat(prec))
            .max()
            .map(|p| p.0)
            .unwrap_or(0f32);
        ap += p_max / 11f32;
    }
    ap
}

/// 按 (IoU 阈值, 可见性分箱) 组成的独立统计器集合
///
/// 每个格子一个 APCalculator，互不共享任何计数；同一批预测配上
/// 各分箱过滤后的真值，逐格投喂。
pub struct APCalculatorGrid {
    calculators: BTreeMap<(OrderedFloat<f32>, usize), APCalculator>,
    num_vis_bins: usize,
}

impl APCalculatorGrid {
    pub fn new(
        iou_thresholds: &[f32],
        num_vis_bins: usize,
        class2type: Option<HashMap<usize, String>>,
        use_old_type_overlap: bool,
    ) -> Result<Self, EvalError> {
        let mut calculators = BTreeMap::new();
        for &thresh in iou_thresholds {
            for bin in 0..num_vis_bins {
                calculators.insert(
                    (OrderedFloat(thresh), bin),
                    APCalculator::new(thresh, class2type.clone(), use_old_type_overlap)?,
                );
            }
        }
        Ok(Self {
            calculators,
            num_vis_bins,
        })
    }

    /// 向指定分箱的所有 IoU 阈值统计器累计同一个 batch。
    /// 分箱序号超出网格范围按契约违反拒绝，不会静默丢弃数据。
    pub fn step(
        &mut self,
        vis_bin: usize,
        batch_preds: &[Vec<ScoredBox>],
        batch_gts: &[Vec<GroundTruthBox>],
    ) -> Result<(), EvalError> {
        if vis_bin >= self.num_vis_bins {
            return Err(EvalError::VisBinOutOfRange {
                vis_bin,
                num_vis_bins: self.num_vis_bins,
            });
        }
        for ((_, bin), calculator) in self.calculators.iter_mut() {
            if *bin == vis_bin {
                calculator.step(batch_preds, batch_gts)?;
            }
        }
        Ok(())
    }

    pub fn get(&self, iou_thresh: f32, vis_bin: usize) -> Option<&APCalculator> {
        self.calculators.get(&(OrderedFloat(iou_thresh), vis_bin))
    }

    /// 逐格计算最终指标，键为 (IoU 阈值, 分箱)
    pub fn compute_metrics(&self) -> BTreeMap<(OrderedFloat<f32>, usize), Metrics> {
        self.calculators
            .iter()
            .map(|(&key, calculator)| (key, calculator.compute_metrics()))
            .collect()
    }
}

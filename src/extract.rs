//! # 预测 / 真值抽取
//!
//! 把解码后的网络输出和原始标注转换成逐样本的 (类别, 框, 分数) /
//! (类别, 框) 列表。所有行为开关集中在一个不可变的 EvalConfig 里，
//! 由调用方显式传入，不存在可变的全局配置。

use tracing::debug;

use crate::data::input::{Frame, LabeledFrame};
use crate::data::{GroundTruthBox, ScoredBox};
use crate::error::EvalError;
use crate::nms::{nms_indices, NmsMode};

/// 抽取与 NMS 的全部配置开关
#[derive(Clone, Debug)]
pub struct EvalConfig {
    /// 丢弃体积退化的空框
    pub remove_empty_box: bool,
    /// NMS 用旋转 3d IoU 而不是底面 2d IoU
    pub use_3d_nms: bool,
    /// NMS 抑制阈值，[0, 1)
    pub nms_iou: f32,
    /// 用旧式「相交 / candidate 面积」重叠公式（仅为结果兼容保留）
    pub use_old_type_nms: bool,
    /// 逐类 NMS：不同类的框互不抑制
    pub cls_nms: bool,
    /// 每个存活 proposal 按每个类别复制一份，分数为 objectness × 该类概率
    pub per_class_proposal: bool,
    /// objectness 低于该值的 proposal 被丢弃
    pub conf_thresh: f32,
    /// 类别总数，类别 id 的合法范围是 0..num_class
    pub num_class: usize,
}

impl EvalConfig {
    /// 常规评估用的默认开关组合
    pub fn new(num_class: usize) -> Self {
        Self {
            remove_empty_box: true,
            use_3d_nms: false,
            nms_iou: 0.25,
            use_old_type_nms: false,
            cls_nms: false,
            per_class_proposal: false,
            conf_thresh: 0.05,
            num_class,
        }
    }
}

/// 逐样本把 proposal 转成 ScoredBox 列表
///
/// 每帧依次：argmax 得到语义类别 → 可选地去掉空框 → 置信度过滤 →
/// 贪心 NMS → 可选的逐类复制。输出与输入帧一一对应。
pub fn parse_predictions(
    frames: &[Frame],
    cfg: &EvalConfig,
) -> Result<Vec<Vec<ScoredBox>>, EvalError> {
    frames.iter().map(|frame| parse_frame(frame, cfg)).collect()
}

fn parse_frame(frame: &Frame, cfg: &EvalConfig) -> Result<Vec<ScoredBox>, EvalError> {
    // (原 proposal 下标, 带分框)；下标用于逐类复制时取回每类概率
    let mut candidates: Vec<(usize, ScoredBox)> = Vec::new();
    for (idx, proposal) in frame.proposals.iter().enumerate() {
        if proposal.sem_cls_probs.len() != cfg.num_class {
            return Err(EvalError::TaxonomySizeMismatch {
                got: proposal.sem_cls_probs.len(),
                expected: cfg.num_class,
            });
        }
        if cfg.remove_empty_box && proposal.bbox_3d.is_empty() {
            continue;
        }
        if proposal.objectness < cfg.conf_thresh {
            continue;
        }
        let (class_id, _) = proposal.argmax_class();
        candidates.push((
            idx,
            ScoredBox {
                class_id,
                bbox_3d: proposal.bbox_3d,
                score: proposal.objectness,
            },
        ));
    }

    let boxes: Vec<ScoredBox> = candidates.iter().map(|(_, b)| *b).collect();
    let mode = if cfg.use_3d_nms {
        NmsMode::Rotated3D
    } else {
        NmsMode::Bev2D
    };
    let keep = nms_indices(&boxes, cfg.nms_iou, mode, cfg.cls_nms, cfg.use_old_type_nms)?;

    let mut out = Vec::new();
    for &k in &keep {
        let (proposal_idx, survivor) = candidates[k];
        if cfg.per_class_proposal {
            // 下游逐类 AP 统计需要每个类别各有一个分数，而不是单个 argmax 类别
            for (class_id, &prob) in frame.proposals[proposal_idx].sem_cls_probs.iter().enumerate()
            {
                out.push(ScoredBox {
                    class_id,
                    bbox_3d: survivor.bbox_3d,
                    score: survivor.score * prob,
                });
            }
        } else {
            out.push(survivor);
        }
    }
    debug!(
        num_proposal = frame.proposals.len(),
        num_kept = out.len(),
        "parsed predictions"
    );
    Ok(out)
}

/// 逐样本把标注转成 GroundTruthBox 列表
///
/// vis_bin 给定时只保留属于该分箱的物体；同一批预测配上各分箱过滤出的
/// 真值子集，就得到按分箱独立评估的多路 AP 统计。
pub fn parse_groundtruths(
    frames: &[LabeledFrame],
    vis_bin: Option<usize>,
    cfg: &EvalConfig,
) -> Result<Vec<Vec<GroundTruthBox>>, EvalError> {
    frames
        .iter()
        .map(|frame| {
            let mut out = Vec::new();
            for object in &frame.objects {
                if object.class_id >= cfg.num_class {
                    return Err(EvalError::ClassOutOfRange {
                        class_id: object.class_id,
                        num_class: cfg.num_class,
                    });
                }
                if let Some(bin) = vis_bin {
                    if !object.in_bin(bin) {
                        continue;
                    }
                }
                out.push(GroundTruthBox {
                    class_id: object.class_id,
                    bbox_3d: object.bbox_3d,
                });
            }
            Ok(out)
        })
        .collect()
}

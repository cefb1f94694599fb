//! # 数据输出接口
//!
//! compute_metrics 的产物。外部的日志/驱动层只消费这里的结构，
//! 不会接触累计器内部状态。

use std::collections::{BTreeMap, HashMap};

/// 单个类别的最终指标
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ClassMetrics {
    /// 11 点插值的 Average Precision
    pub ap: f32,
    /// 使用全部预测（不做置信度截断）时达到的 recall
    pub ar: f32,
    /// 该类别累计的真值框总数，为 0 的类别不参与 mAP/AR 求均
    pub num_gt: usize,
}

/// 一次评估（单个 IoU 阈值 × 单个可见性分箱）的完整指标
#[derive(Clone, Debug, PartialEq)]
pub struct Metrics {
    /// 类别 id -> 指标，只包含出现过真值或预测的类别
    pub per_class: BTreeMap<usize, ClassMetrics>,
    /// 有真值类别上 AP 的算术平均
    pub mean_ap: f32,
    /// 有真值类别上 AR 的算术平均
    pub mean_ar: f32,
}

impl Metrics {
    /// 展平成「指标名 -> 数值」，键的迭代顺序确定。
    /// 有 class2type 映射时用类别名命名，否则退回类别 id。
    pub fn flatten(&self, class2type: Option<&HashMap<usize, String>>) -> BTreeMap<String, f32> {
        let mut out = BTreeMap::new();
        for (&class_id, metrics) in &self.per_class {
            let name = class2type
                .and_then(|m| m.get(&class_id).cloned())
                .unwrap_or_else(|| class_id.to_string());
            out.insert(format!("{} Average Precision", name), metrics.ap);
            out.insert(format!("{} Recall", name), metrics.ar);
        }
        out.insert("mAP".to_string(), self.mean_ap);
        out.insert("AR".to_string(), self.mean_ar);
        out
    }
}

//! # 数据输入接口
//!
//! 网络前向与框解码都在外部完成，这里只约定「已解码」的输入形态：
//! 每个样本一帧 proposal（每类概率 + objectness + 3d 框），
//! 以及每个样本一帧标注（类别 + 3d 框 + 可见性分箱成员关系）。

use super::BBox3D;

/// 单个已解码的候选框
#[derive(Clone, Debug)]
pub struct Proposal {
    /// 每个类别的语义概率，长度 = num_class
    pub sem_cls_probs: Vec<f32>,
    /// objectness / 置信度，[0, 1]
    pub objectness: f32,
    pub bbox_3d: BBox3D::XYZLHWRotY,
}

impl Proposal {
    /// 语义概率的 argmax：(类别 id, 概率)，并列时取下标最小者
    pub fn argmax_class(&self) -> (usize, f32) {
        let (mut best_idx, mut best_prob) = (0usize, f32::NEG_INFINITY);
        for (idx, &prob) in self.sem_cls_probs.iter().enumerate() {
            if prob > best_prob {
                best_idx = idx;
                best_prob = prob;
            }
        }
        (best_idx, best_prob)
    }
}

/// 一个样本的全部 proposal
#[derive(Clone, Debug, Default)]
pub struct Frame {
    pub proposals: Vec<Proposal>,
}

/// 单个标注物体
///
/// vis_bins\[k\] 表示该物体是否属于第 k 个可见性分箱。分箱是外部按遮挡/截断等
/// 标准算好的真值划分，这里不假设其物理含义；空的 vis_bins 表示属于所有分箱。
#[derive(Clone, Debug)]
pub struct LabeledObject {
    pub class_id: usize,
    pub bbox_3d: BBox3D::XYZLHWRotY,
    pub vis_bins: Vec<bool>,
}

impl LabeledObject {
    pub fn in_bin(&self, bin: usize) -> bool {
        self.vis_bins.is_empty() || self.vis_bins.get(bin).copied().unwrap_or(false)
    }
}

/// 一个样本的全部标注
#[derive(Clone, Debug, Default)]
pub struct LabeledFrame {
    pub objects: Vec<LabeledObject>,
}

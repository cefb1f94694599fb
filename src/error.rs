use thiserror::Error;

/// 调用方契约错误
///
/// 几何上的退化（零体积框、不相交多边形）和空输入都不是错误，
/// 由各算法确定性地归结为 IoU = 0 / 空输出；只有下面这些契约违反会被立即上抛。
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvalError {
    /// step 的预测序列和真值序列必须按样本一一对齐
    #[error("batch size mismatch: {predictions} prediction samples vs {groundtruths} groundtruth samples")]
    BatchSizeMismatch {
        predictions: usize,
        groundtruths: usize,
    },

    /// IoU 阈值必须在 [0, 1) 内，超出即拒绝（不做 clamp）
    #[error("IoU threshold {0} is outside [0, 1)")]
    InvalidIouThreshold(f32),

    /// 类别 id 超出了外部给定的类别总数
    #[error("class id {class_id} is outside the taxonomy of size {num_class}")]
    ClassOutOfRange { class_id: usize, num_class: usize },

    /// proposal 携带的每类分数个数和类别总数不一致
    #[error("proposal carries {got} class scores but the taxonomy has {expected} classes")]
    TaxonomySizeMismatch { got: usize, expected: usize },

    /// 可见性分箱序号超出了构造统计器网格时给定的分箱数
    #[error("visibility bin {vis_bin} is outside the grid of {num_vis_bins} bins")]
    VisBinOutOfRange { vis_bin: usize, num_vis_bins: usize },
}

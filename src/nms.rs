//! # NMS 引擎
//!
//! 单样本内的标准贪心非极大值抑制。纯函数、无共享状态，
//! 样本之间互相独立，跨样本并行由调用方自由安排。

use std::cmp::Reverse;

use ordered_float::OrderedFloat;

use crate::data::ScoredBox;
use crate::error::EvalError;
use crate::geometry;

/// 重叠计算方式：底面轴对齐 2d，或旋转 3d
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NmsMode {
    Bev2D,
    Rotated3D,
}

/// 贪心 NMS，返回保留下来的输入下标（按选中顺序，即分数降序）
///
/// 1. 按分数降序稳定排序，分数相同保持原输入顺序；
/// 2. 反复取分数最高的剩余框加入保留集，抑制与其重叠超过阈值的剩余框；
/// 3. cls_nms 为真时只在同类框之间计算重叠与抑制，不同类框互不影响。
///
/// 空输入返回空输出；阈值在 [0, 1) 之外按契约违反拒绝。
pub fn nms_indices(
    boxes: &[ScoredBox],
    iou_threshold: f32,
    mode: NmsMode,
    cls_nms: bool,
    old_type: bool,
) -> Result<Vec<usize>, EvalError> {
    if !(0f32..1f32).contains(&iou_threshold) {
        return Err(EvalError::InvalidIouThreshold(iou_threshold));
    }
    if boxes.is_empty() {
        return Ok(Vec::new());
    }

    // 角点与底面矩形只算一次，两两比较时复用
    let corners: Vec<_> = boxes.iter().map(|b| b.bbox_3d.to_CornerPoints()).collect();
    let aabbs: Vec<_> = corners.iter().map(geometry::footprint_aabb).collect();

    let mut order: Vec<usize> = (0..boxes.len()).collect();
    order.sort_by_key(|&i| Reverse(OrderedFloat(boxes[i].score)));

    let mut suppressed = vec![false; boxes.len()];
    let mut keep = Vec::new();
    for (rank, &i) in order.iter().enumerate() {
        if suppressed[i] {
            continue;
        }
        keep.push(i);
        for &j in &order[rank + 1..] {
            if suppressed[j] {
                continue;
            }
            if cls_nms && boxes[i].class_id != boxes[j].class_id {
                continue;
            }
            let overlap = match (mode, old_type) {
                (NmsMode::Bev2D, false) => geometry::iou2d(&aabbs[i], &aabbs[j]),
                (NmsMode::Bev2D, true) => geometry::overlap2d_old_type(&aabbs[i], &aabbs[j]),
                (NmsMode::Rotated3D, false) => geometry::iou3d(&corners[i], &corners[j]).0,
                (NmsMode::Rotated3D, true) => geometry::overlap3d_old_type(&corners[i], &corners[j]),
            };
            if overlap > iou_threshold {
                suppressed[j] = true;
            }
        }
    }
    Ok(keep)
}

/// nms_indices 的便捷封装，直接返回保留下来的框（字段原样保留）
pub fn nms(
    boxes: &[ScoredBox],
    iou_threshold: f32,
    mode: NmsMode,
    cls_nms: bool,
    old_type: bool,
) -> Result<Vec<ScoredBox>, EvalError> {
    let keep = nms_indices(boxes, iou_threshold, mode, cls_nms, old_type)?;
    Ok(keep.into_iter().map(|i| boxes[i]).collect())
}

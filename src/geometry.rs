//! # 几何内核
//!
//! 旋转 3d 框的 IoU 通过底面凸多边形求交（geo + geo-clipper）乘以竖直重叠长度得到。
//! 所有退化情形（零体积、不相交）都确定性地归结为 0，不产生错误。

use geo::{intersects::Intersects, polygon, prelude::Area, Polygon};
use geo_clipper::Clipper;

use crate::data::{BBox2D, BBox3D};

/// 面积/体积小于该值按零处理，避免除零
const DEGENERATE_EPS: f64 = 1e-8;

/// geo-clipper 内部定点运算的缩放因子
const CLIPPER_FACTOR: f64 = 1e6;

/// 底面 4 个角点投到 x–z 平面得到的多边形
pub fn footprint_polygon(corners: &BBox3D::CornerPoints) -> Polygon<f64> {
    let BBox3D::CornerPoints(c0, c1, c2, c3, ..) = corners;
    polygon![
        (x: c0[0] as f64, y: c0[2] as f64),
        (x: c1[0] as f64, y: c1[2] as f64),
        (x: c2[0] as f64, y: c2[2] as f64),
        (x: c3[0] as f64, y: c3[2] as f64),
    ]
}

/// 底面 4 个角点在 x–z 平面上的轴对齐包围矩形
pub fn footprint_aabb(corners: &BBox3D::CornerPoints) -> BBox2D {
    let BBox3D::CornerPoints(c0, c1, c2, c3, ..) = corners;
    let xs = [c0[0], c1[0], c2[0], c3[0]];
    let zs = [c0[2], c1[2], c2[2], c3[2]];
    let fold = |vals: [f32; 4], f: fn(f32, f32) -> f32| vals.iter().copied().fold(vals[0], f);
    BBox2D {
        x1: fold(xs, f32::min),
        z1: fold(zs, f32::min),
        x2: fold(xs, f32::max),
        z2: fold(zs, f32::max),
    }
}

/// 两凸多边形的相交面积，分离时为 0
pub fn convex_polygon_intersection_area(poly_a: &Polygon<f64>, poly_b: &Polygon<f64>) -> f64 {
    if !poly_a.intersects(poly_b) {
        return 0f64;
    }
    // clipper 可能切出多块，面积求和
    poly_a.intersection(poly_b, CLIPPER_FACTOR).unsigned_area()
}

/// 旋转 3d 框的 (3d IoU, 底面 2d IoU)
///
/// 相交体积 = 底面相交面积 × 竖直重叠长度；任一框体积退化或两框不重叠时为 (0, 0)
pub fn iou3d(bbox1: &BBox3D::CornerPoints, bbox2: &BBox3D::CornerPoints) -> (f32, f32) {
    let (base1, base2) = (footprint_polygon(bbox1), footprint_polygon(bbox2));
    let (base1_area, base2_area) = (base1.unsigned_area(), base2.unsigned_area());

    let intersection_area = convex_polygon_intersection_area(&base1, &base2);
    let base_union = base1_area + base2_area - intersection_area;
    let iou_2d = if base_union <= DEGENERATE_EPS {
        0f64
    } else {
        intersection_area / base_union
    };

    let ((bottom1, top1), (bottom2, top2)) = (bbox1.y_extent(), bbox2.y_extent());
    let h_intersection_len = (top1.min(top2) - bottom1.max(bottom2)).max(0f32) as f64;

    let (bbox1_vol, bbox2_vol, intersection_vol) = (
        base1_area * (top1 - bottom1) as f64,
        base2_area * (top2 - bottom2) as f64,
        intersection_area * h_intersection_len,
    );
    let vol_union = bbox1_vol + bbox2_vol - intersection_vol;
    let iou_3d = if vol_union <= DEGENERATE_EPS {
        0f64
    } else {
        intersection_vol / vol_union
    };

    (iou_3d as f32, iou_2d as f32)
}

/// 轴对齐矩形的经典 2d IoU（忽略朝向角）
pub fn iou2d(a: &BBox2D, b: &BBox2D) -> f32 {
    let inter = BBox2D {
        x1: a.x1.max(b.x1),
        z1: a.z1.max(b.z1),
        x2: a.x2.min(b.x2),
        z2: a.z2.min(b.z2),
    }
    .area();
    let union = a.area() + b.area() - inter;
    if (union as f64) <= DEGENERATE_EPS {
        0f32
    } else {
        inter / union
    }
}

/// 旧式 2d 重叠：相交面积只除以 candidate 一方的面积（非对称，仅配置显式要求时使用）
pub fn overlap2d_old_type(kept: &BBox2D, candidate: &BBox2D) -> f32 {
    let inter = BBox2D {
        x1: kept.x1.max(candidate.x1),
        z1: kept.z1.max(candidate.z1),
        x2: kept.x2.min(candidate.x2),
        z2: kept.z2.min(candidate.z2),
    }
    .area();
    let denom = candidate.area();
    if (denom as f64) <= DEGENERATE_EPS {
        0f32
    } else {
        inter / denom
    }
}

/// 旧式 3d 重叠：相交体积只除以 candidate 一方的体积
pub fn overlap3d_old_type(kept: &BBox3D::CornerPoints, candidate: &BBox3D::CornerPoints) -> f32 {
    let (base_kept, base_cand) = (footprint_polygon(kept), footprint_polygon(candidate));
    let intersection_area = convex_polygon_intersection_area(&base_kept, &base_cand);

    let ((bottom_k, top_k), (bottom_c, top_c)) = (kept.y_extent(), candidate.y_extent());
    let h_intersection_len = (top_k.min(top_c) - bottom_k.max(bottom_c)).max(0f32) as f64;

    let intersection_vol = intersection_area * h_intersection_len;
    let candidate_vol = base_cand.unsigned_area() * (top_c - bottom_c) as f64;
    if candidate_vol <= DEGENERATE_EPS {
        0f32
    } else {
        (intersection_vol / candidate_vol) as f32
    }
}

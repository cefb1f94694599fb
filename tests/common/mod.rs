#![allow(dead_code)]

use std::convert::TryFrom;

use once_cell::sync::Lazy;

use eval3d::data::{BBox3D, GroundTruthBox, ObjectType, ScoredBox};

/// 内嵌的小型评估数据，每行：
/// sample,class,score,x,y,z,l,h,w,rot_y
/// score 为负表示真值框（真值没有分数）
pub const SAMPLE_DATA: &str = "\
0,0,0.95,0,0,0,2,2,2,0
0,0,0.99,10,0,0,2,2,2,0
0,0,-1,0,0,0,2,2,2,0
1,1,0.9,5,0,5,4,2,2,0.785
1,2,0.5,-5,0,-5,1,1,1,0
1,1,-1,5,0,5,4,2,2,0.785
";

/// 解析好的 (逐样本预测, 逐样本真值)
pub static FIXTURE: Lazy<(Vec<Vec<ScoredBox>>, Vec<Vec<GroundTruthBox>>)> = Lazy::new(|| {
    let (mut preds, mut gts): (Vec<Vec<ScoredBox>>, Vec<Vec<GroundTruthBox>>) =
        (Vec::new(), Vec::new());
    for each_line in SAMPLE_DATA.split('\n') {
        if each_line.trim().is_empty() {
            continue;
        }
        let (sample, class, score, x, y, z, l, h, w, rot_y): (
            usize,
            u8,
            f32,
            f32,
            f32,
            f32,
            f32,
            f32,
            f32,
            f32,
        );
        text_io::scan!(each_line.bytes() => "{},{},{},{},{},{},{},{},{},{}",
            sample, class, score, x, y, z, l, h, w, rot_y);

        let class_id = ObjectType::try_from(class).unwrap() as usize;
        while preds.len() <= sample {
            preds.push(Vec::new());
            gts.push(Vec::new());
        }
        let bbox_3d = BBox3D::XYZLHWRotY(x, y, z, l, h, w, rot_y);
        if score < 0f32 {
            gts[sample].push(GroundTruthBox { class_id, bbox_3d });
        } else {
            preds[sample].push(ScoredBox {
                class_id,
                bbox_3d,
                score,
            });
        }
    }
    (preds, gts)
});

pub fn bbox(x: f32, y: f32, z: f32, l: f32, h: f32, w: f32, rot_y: f32) -> BBox3D::XYZLHWRotY {
    BBox3D::XYZLHWRotY(x, y, z, l, h, w, rot_y)
}

pub fn scored(class_id: usize, score: f32, bbox_3d: BBox3D::XYZLHWRotY) -> ScoredBox {
    ScoredBox {
        class_id,
        bbox_3d,
        score,
    }
}

pub fn gt(class_id: usize, bbox_3d: BBox3D::XYZLHWRotY) -> GroundTruthBox {
    GroundTruthBox { class_id, bbox_3d }
}

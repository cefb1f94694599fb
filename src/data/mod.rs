use std::collections::HashMap;

use strum::IntoEnumIterator;
use strum_macros::{Display, EnumIter, EnumString};

/// 示例类别表，核心接口一律以 usize 类别 id + 外部给定的 num_class 工作，
/// 这个枚举只在需要把 id 映射成可读名称（class2type）时使用
#[derive(Clone, Copy, PartialEq, Eq, Debug, num_enum::TryFromPrimitive, Display, EnumIter, EnumString)]
#[repr(u8)]
pub enum ObjectType {
    #[strum(ascii_case_insensitive)]
    Pedestrian = 0,
    #[strum(ascii_case_insensitive)]
    Car = 1,
    #[strum(ascii_case_insensitive)]
    Cyclist = 2,
}

impl ObjectType {
    /// 类别 id 到类别名称的映射，供指标输出时命名各类的 AP/Recall 键
    pub fn class2type_map() -> HashMap<usize, String> {
        Self::iter().map(|t| (t as usize, t.to_string())).collect()
    }
}

/// 底面（x–z 平面）上的轴对齐矩形
#[derive(Clone, Copy, Debug)]
pub struct BBox2D {
    pub x1: f32,
    pub z1: f32,
    pub x2: f32,
    pub z2: f32,
}

impl BBox2D {
    pub fn area(&self) -> f32 {
        (self.x2 - self.x1).max(0f32) * (self.z2 - self.z1).max(0f32)
    }
}

/*
    坐标约定：y 为竖直方向，朝向角 rot_y 是绕 y 轴的旋转（弧度），
    框不会在其余两轴上倾斜。

                     (7)_________(6)
                       /|       /|
                      / |      / |
                     /  |     /  |
                 (4)/___|____/(5)|
                    |   |    |   |
                    |(3)|____|___|(2)
                 h  |   /    |   /
                    |  /   O.|__/_____ x'
                    | /      | /
                 (0)|/_______|/(1)

                    |<---l-->|   （w 沿 z 轴）

    O 是框的几何中心，0~3 为底面角点，4~7 为对应的顶面角点（i 与 i+4 的 x/z 相同），
    从 +y 向下看 0→1→2→3 沿同一绕向。角点顺序是固定约定，求交与 IoU 都依赖它。
*/

#[allow(non_snake_case)]
pub mod BBox3D {
    use nalgebra as na;

    use derive_more::Display;

    /// 中心点 (x, y, z) + 全尺寸 (l, h, w)（分别沿 x、y、z 轴，非负）+ 绕 y 轴朝向角 rot_y
    ///
    /// rot_y 不要求归一化到某个区间：重叠计算只依赖相对角度差
    #[derive(Clone, Copy, Debug, PartialEq, Display)]
    #[display(
        fmt = "x: {}, y: {}, z: {}, l: {}, h: {}, w: {}, rot_y: {}",
        "_0",
        "_1",
        "_2",
        "_3",
        "_4",
        "_5",
        "_6"
    )]
    pub struct XYZLHWRotY(
        pub f32,
        pub f32,
        pub f32,
        pub f32,
        pub f32,
        pub f32,
        pub f32,
    );

    impl XYZLHWRotY {
        pub fn to_CornerPoints(&self) -> CornerPoints {
            let Self(x, y, z, l, h, w, rot_y) = self;
            let iso = na::Isometry3::new(na::Vector3::new(*x, *y, *z), na::Vector3::y() * (*rot_y));
            CornerPoints(
                // 单位框先按尺寸缩放，再绕 y 轴旋转，最后平移到中心
                iso * na::Point3::<f32>::new(-l / 2f32, -h / 2f32, -w / 2f32),
                iso * na::Point3::<f32>::new(l / 2f32, -h / 2f32, -w / 2f32),
                iso * na::Point3::<f32>::new(l / 2f32, -h / 2f32, w / 2f32),
                iso * na::Point3::<f32>::new(-l / 2f32, -h / 2f32, w / 2f32),
                iso * na::Point3::<f32>::new(-l / 2f32, h / 2f32, -w / 2f32),
                iso * na::Point3::<f32>::new(l / 2f32, h / 2f32, -w / 2f32),
                iso * na::Point3::<f32>::new(l / 2f32, h / 2f32, w / 2f32),
                iso * na::Point3::<f32>::new(-l / 2f32, h / 2f32, w / 2f32),
            )
        }

        pub fn volume(&self) -> f32 {
            self.3 * self.4 * self.5
        }

        /// 体积退化的空框，remove_empty_box 选项会把这类 proposal 丢掉
        pub fn is_empty(&self) -> bool {
            self.volume() <= f32::EPSILON
        }
    }

    /// 8 个世界坐标角点，顺序见 data 模块开头的约定图
    #[derive(Clone, Copy, Debug)]
    pub struct CornerPoints(
        pub na::Point3<f32>,
        pub na::Point3<f32>,
        pub na::Point3<f32>,
        pub na::Point3<f32>,
        pub na::Point3<f32>,
        pub na::Point3<f32>,
        pub na::Point3<f32>,
        pub na::Point3<f32>,
    );

    impl CornerPoints {
        /// 竖直方向的 (底, 顶)
        pub fn y_extent(&self) -> (f32, f32) {
            let (bottom, top) = (self.0[1], self.4[1]);
            (bottom.min(top), bottom.max(top))
        }
    }
}

/// 抽取器产出、NMS 与 AP 统计消费的带分预测框
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ScoredBox {
    pub class_id: usize,
    pub bbox_3d: BBox3D::XYZLHWRotY,
    /// 置信度，[0, 1]
    pub score: f32,
}

/// 单个真值框，无分数
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GroundTruthBox {
    pub class_id: usize,
    pub bbox_3d: BBox3D::XYZLHWRotY,
}

pub mod input;

pub mod output;

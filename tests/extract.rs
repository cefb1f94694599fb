mod common;

use common::bbox;
use eval3d::data::input::{Frame, LabeledFrame, LabeledObject, Proposal};
use eval3d::extract::{parse_groundtruths, parse_predictions, EvalConfig};
use eval3d::EvalError;

fn proposal(sem_cls_probs: Vec<f32>, objectness: f32, b: eval3d::data::BBox3D::XYZLHWRotY) -> Proposal {
    Proposal {
        sem_cls_probs,
        objectness,
        bbox_3d: b,
    }
}

fn labeled(class_id: usize, b: eval3d::data::BBox3D::XYZLHWRotY, vis_bins: Vec<bool>) -> LabeledObject {
    LabeledObject {
        class_id,
        bbox_3d: b,
        vis_bins,
    }
}

#[test]
fn confidence_threshold_filters_proposals() {
    let cfg = EvalConfig {
        conf_thresh: 0.5f32,
        ..EvalConfig::new(3)
    };
    let frame = Frame {
        proposals: vec![
            proposal(vec![0.8f32, 0.1f32, 0.1f32], 0.9f32, bbox(0f32, 0f32, 0f32, 2f32, 2f32, 2f32, 0f32)),
            proposal(vec![0.8f32, 0.1f32, 0.1f32], 0.3f32, bbox(10f32, 0f32, 0f32, 2f32, 2f32, 2f32, 0f32)),
        ],
    };
    let parsed = parse_predictions(&[frame], &cfg).unwrap();
    assert_eq!(parsed[0].len(), 1);
    assert_eq!(parsed[0][0].score, 0.9f32);
}

#[test]
fn argmax_assigns_semantic_class() {
    let cfg = EvalConfig::new(3);
    let frame = Frame {
        proposals: vec![proposal(
            vec![0.1f32, 0.2f32, 0.7f32],
            0.9f32,
            bbox(0f32, 0f32, 0f32, 2f32, 2f32, 2f32, 0f32),
        )],
    };
    let parsed = parse_predictions(&[frame], &cfg).unwrap();
    assert_eq!(parsed[0][0].class_id, 2);
}

#[test]
fn empty_box_removal_is_optional() {
    let degenerate = bbox(0f32, 0f32, 0f32, 0f32, 0f32, 0f32, 0f32);
    let frame = Frame {
        proposals: vec![proposal(vec![1f32, 0f32, 0f32], 0.9f32, degenerate)],
    };
    let cfg = EvalConfig::new(3);
    assert!(parse_predictions(&[frame.clone()], &cfg).unwrap()[0].is_empty());

    let cfg = EvalConfig {
        remove_empty_box: false,
        ..EvalConfig::new(3)
    };
    assert_eq!(parse_predictions(&[frame], &cfg).unwrap()[0].len(), 1);
}

#[test]
fn nms_collapses_overlapping_proposals() {
    let cfg = EvalConfig {
        use_3d_nms: true,
        ..EvalConfig::new(3)
    };
    let frame = Frame {
        proposals: vec![
            proposal(vec![1f32, 0f32, 0f32], 0.9f32, bbox(0f32, 0f32, 0f32, 2f32, 2f32, 2f32, 0f32)),
            proposal(vec![1f32, 0f32, 0f32], 0.8f32, bbox(0.1f32, 0f32, 0f32, 2f32, 2f32, 2f32, 0f32)),
            proposal(vec![1f32, 0f32, 0f32], 0.7f32, bbox(20f32, 0f32, 0f32, 2f32, 2f32, 2f32, 0f32)),
        ],
    };
    let parsed = parse_predictions(&[frame], &cfg).unwrap();
    let scores: Vec<f32> = parsed[0].iter().map(|b| b.score).collect();
    assert_eq!(scores, vec![0.9f32, 0.7f32]);
}

#[test]
fn per_class_proposal_duplicates_survivors() {
    let cfg = EvalConfig {
        per_class_proposal: true,
        ..EvalConfig::new(3)
    };
    let frame = Frame {
        proposals: vec![proposal(
            vec![0.5f32, 0.3f32, 0.2f32],
            0.8f32,
            bbox(0f32, 0f32, 0f32, 2f32, 2f32, 2f32, 0f32),
        )],
    };
    let parsed = parse_predictions(&[frame], &cfg).unwrap();
    // 一个存活 proposal 按 num_class 复制，分数为 objectness × 每类概率
    assert_eq!(parsed[0].len(), 3);
    let expected = [0.8f32 * 0.5f32, 0.8f32 * 0.3f32, 0.8f32 * 0.2f32];
    for (out, (class_id, want)) in parsed[0].iter().zip(expected.iter().enumerate()) {
        assert_eq!(out.class_id, class_id);
        assert!((out.score - want).abs() < 1e-6);
    }
}

#[test]
fn taxonomy_size_mismatch_rejected() {
    let cfg = EvalConfig::new(3);
    let frame = Frame {
        proposals: vec![proposal(
            vec![0.5f32, 0.5f32],
            0.9f32,
            bbox(0f32, 0f32, 0f32, 2f32, 2f32, 2f32, 0f32),
        )],
    };
    assert_eq!(
        parse_predictions(&[frame], &cfg),
        Err(EvalError::TaxonomySizeMismatch {
            got: 2,
            expected: 3,
        })
    );
}

#[test]
fn groundtruth_class_out_of_range_rejected() {
    let cfg = EvalConfig::new(3);
    let frame = LabeledFrame {
        objects: vec![labeled(7, bbox(0f32, 0f32, 0f32, 2f32, 2f32, 2f32, 0f32), Vec::new())],
    };
    assert_eq!(
        parse_groundtruths(&[frame], None, &cfg),
        Err(EvalError::ClassOutOfRange {
            class_id: 7,
            num_class: 3,
        })
    );
}

#[test]
fn visibility_bins_partition_groundtruths() {
    let cfg = EvalConfig::new(3);
    let b = bbox(0f32, 0f32, 0f32, 2f32, 2f32, 2f32, 0f32);
    let frame = LabeledFrame {
        objects: vec![
            labeled(0, b, vec![true, false]),
            labeled(1, b, vec![false, true]),
            // 空 vis_bins 属于所有分箱
            labeled(2, b, Vec::new()),
        ],
    };

    let all = parse_groundtruths(&[frame.clone()], None, &cfg).unwrap();
    assert_eq!(all[0].len(), 3);

    let bin0 = parse_groundtruths(&[frame.clone()], Some(0), &cfg).unwrap();
    let classes: Vec<usize> = bin0[0].iter().map(|g| g.class_id).collect();
    assert_eq!(classes, vec![0, 2]);

    let bin1 = parse_groundtruths(&[frame.clone()], Some(1), &cfg).unwrap();
    let classes: Vec<usize> = bin1[0].iter().map(|g| g.class_id).collect();
    assert_eq!(classes, vec![1, 2]);

    // 超出标注范围的分箱：显式标了分箱的物体不算成员
    let bin9 = parse_groundtruths(&[frame], Some(9), &cfg).unwrap();
    let classes: Vec<usize> = bin9[0].iter().map(|g| g.class_id).collect();
    assert_eq!(classes, vec![2]);
}

#[test]
fn empty_frames_yield_empty_lists() {
    let cfg = EvalConfig::new(3);
    let parsed = parse_predictions(&[Frame::default()], &cfg).unwrap();
    assert!(parsed[0].is_empty());
    let parsed = parse_groundtruths(&[LabeledFrame::default()], Some(0), &cfg).unwrap();
    assert!(parsed[0].is_empty());
}

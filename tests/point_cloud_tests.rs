// SPDX-License-Identifier: GPL-3.0-only

//! Point cloud projection and file format

use depth_recorder::backends::DepthFrame;
use depth_recorder::pipelines::point_cloud::{
    PointCloud, project, read_point_cloud, write_point_cloud,
};
use std::time::Duration;

fn ramp(width: u32, height: u32) -> DepthFrame {
    let data = (0..width * height)
        .map(|i| if i % 5 == 0 { 0 } else { (400 + i * 3) as u16 })
        .collect();
    DepthFrame::new(width, height, data, Duration::from_micros(1234)).unwrap()
}

#[test]
fn test_point_index_maps_to_pixel() {
    let depth = ramp(7, 5);
    let cloud = project(&depth);

    assert_eq!(cloud.point_count(), 35);
    for i in 0..35usize {
        let [x, y, z] = cloud.point(i).unwrap();
        assert_eq!(x, (i % 7) as f32);
        assert_eq!(y, (i / 7) as f32);
        assert_eq!(z, depth.data[i] as f32);
    }
    assert_eq!(cloud.point(35), None);
}

#[test]
fn test_round_trip_is_bit_identical() {
    let path = std::env::temp_dir().join(format!("pointcloud_{}.npy", uuid::Uuid::new_v4()));
    let cloud = project(&ramp(64, 48));

    let written = write_point_cloud(&path, &cloud).unwrap();
    assert_eq!(written, 64 * 48 * 3 * 4);

    let points = read_point_cloud(&path).unwrap();
    let restored = PointCloud::from_raw(64, points).unwrap();
    assert_eq!(restored.height, 48);
    assert_eq!(
        restored.points.iter().map(|v| v.to_bits()).collect::<Vec<_>>(),
        cloud.points.iter().map(|v| v.to_bits()).collect::<Vec<_>>()
    );

    std::fs::remove_file(&path).unwrap();
}

#[test]
fn test_summary_helpers() {
    let cloud = project(&ramp(5, 2));
    // Samples 0 and 5 are zero
    assert_eq!(cloud.zero_depth_count(), 2);
    assert_eq!(cloud.depth_range(), Some((403.0, 427.0)));
}

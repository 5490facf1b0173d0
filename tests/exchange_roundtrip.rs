//! Sparse model write/read round trips through real files.

use cubemap_rs::core::{CameraPose, PinholeCamera};
use cubemap_rs::io::{
    load_sparse_model, read_images_bin, write_images_bin, write_sparse_model, CameraIntrinsics,
    CameraModel, ExportError, ImageRecord, Observation, Point3D, SparseModel, TrackElement,
    CAMERAS_FILE, IMAGES_FILE, POINTS3D_FILE,
};
use nalgebra::{UnitQuaternion, Vector3};
use std::fs;

fn sample_model() -> SparseModel {
    let cameras = vec![
        CameraIntrinsics::pinhole(1, &PinholeCamera::for_cube_face(1024, 100.0)),
        CameraIntrinsics::pinhole(2, &PinholeCamera::for_cube_face(512, 90.0)),
        CameraIntrinsics {
            id: 3,
            model: CameraModel::OpenCv,
            width: 4000,
            height: 3000,
            params: vec![3000.0, 3001.5, 2000.0, 1500.0, -0.1, 0.01, 1e-4, -2e-4],
        },
    ];

    let images = (0..5u32)
        .map(|i| {
            let rotation = UnitQuaternion::from_euler_angles(0.1 * i as f64, -0.7, 2.0 - i as f64)
                .to_rotation_matrix()
                .into_inner();
            let pose = CameraPose::new(Vector3::new(i as f64, -0.5, 1e-9 * i as f64), rotation);
            let mut image = ImageRecord::from_pose(i + 1, i % 3 + 1, format!("pano_{}_front.jpg", i), &pose);
            if i == 2 {
                image.observations = vec![
                    Observation {
                        x: 10.25,
                        y: 20.5,
                        point3d_id: 1,
                    },
                    Observation {
                        x: -0.0,
                        y: 1e300,
                        point3d_id: u64::MAX,
                    },
                ];
            }
            image
        })
        .collect();

    let points = (1..=50u64)
        .map(|id| Point3D {
            id,
            xyz: Vector3::new(id as f64 * 0.1, -(id as f64).sqrt(), std::f64::consts::PI),
            rgb: [(id * 5) as u8, 255 - id as u8, 7],
            error: 1.0 / id as f64,
            track: if id == 1 {
                vec![TrackElement {
                    image_id: 3,
                    point2d_idx: 0,
                }]
            } else {
                Vec::new()
            },
        })
        .collect();

    SparseModel {
        cameras,
        images,
        points,
    }
}

#[test]
fn test_model_roundtrip_is_exact() {
    let dir = tempfile::tempdir().unwrap();
    let sparse = dir.path().join("sparse").join("0");
    let model = sample_model();

    write_sparse_model(&sparse, &model).unwrap();
    let loaded = load_sparse_model(&sparse).unwrap();
    assert_eq!(loaded, model);

    // Floats survive bit for bit, including negative zero.
    let obs = &loaded.images[2].observations[1];
    assert_eq!(obs.x.to_bits(), (-0.0f64).to_bits());
    for (a, b) in loaded.images.iter().zip(&model.images) {
        for (qa, qb) in a.quaternion.iter().zip(&b.quaternion) {
            assert_eq!(qa.to_bits(), qb.to_bits());
        }
    }
}

#[test]
fn test_rewriting_produces_identical_bytes() {
    let dir = tempfile::tempdir().unwrap();
    let first = dir.path().join("a");
    let second = dir.path().join("b");
    let model = sample_model();

    write_sparse_model(&first, &model).unwrap();
    write_sparse_model(&second, &load_sparse_model(&first).unwrap()).unwrap();

    for file in [CAMERAS_FILE, IMAGES_FILE, POINTS3D_FILE] {
        assert_eq!(
            fs::read(first.join(file)).unwrap(),
            fs::read(second.join(file)).unwrap(),
            "{} differs",
            file
        );
    }
}

#[test]
fn test_file_sizes_match_layout() {
    let dir = tempfile::tempdir().unwrap();
    let model = sample_model();
    write_sparse_model(dir.path(), &model).unwrap();

    let cameras_size: usize = 8 + model
        .cameras
        .iter()
        .map(|c| 4 + 4 + 8 + 8 + 8 * c.params.len())
        .sum::<usize>();
    let images_size: usize = 8 + model
        .images
        .iter()
        .map(|i| 4 + 32 + 24 + 4 + i.name.len() + 1 + 8 + 24 * i.observations.len())
        .sum::<usize>();
    let points_size: usize = 8 + model
        .points
        .iter()
        .map(|p| 8 + 24 + 3 + 8 + 8 + 8 * p.track.len())
        .sum::<usize>();

    let size = |name: &str| fs::metadata(dir.path().join(name)).unwrap().len() as usize;
    assert_eq!(size(CAMERAS_FILE), cameras_size);
    assert_eq!(size(IMAGES_FILE), images_size);
    assert_eq!(size(POINTS3D_FILE), points_size);
}

#[test]
fn test_failed_write_keeps_previous_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(IMAGES_FILE);
    let model = sample_model();
    write_images_bin(&path, &model.images).unwrap();

    let mut bad = model.images.clone();
    bad[0].name = "broken\0name.jpg".to_string();
    assert!(matches!(
        write_images_bin(&path, &bad),
        Err(ExportError::InvalidName(_))
    ));

    assert_eq!(read_images_bin(&path).unwrap(), model.images);
    let leftovers = fs::read_dir(dir.path()).unwrap().count();
    assert_eq!(leftovers, 1, "temporary files left behind");
}

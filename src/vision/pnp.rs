use super::{PnpSolver, RotationEstimate};
use crate::{pose_estimation::CameraIntrinsics, utils::usize_to_i32, Error, Result};
use nalgebra::{Matrix3, Point2, Point3, Vector3};
use opencv::{
    calib3d,
    core::{Mat, CV_64F},
    prelude::*,
};

/// `calib3d::solve_pnp` followed by a Rodrigues conversion
pub struct OpenCvPnpSolver {
    method: i32,
}

impl Default for OpenCvPnpSolver {
    fn default() -> Self {
        Self {
            method: calib3d::SOLVEPNP_ITERATIVE,
        }
    }
}

impl OpenCvPnpSolver {
    /// Solver using a specific `calib3d::SOLVEPNP_*` method
    #[must_use]
    pub fn with_method(method: i32) -> Self {
        Self { method }
    }

    fn points_to_mat<const N: usize>(rows: impl ExactSizeIterator<Item = [f64; N]>) -> Result<Mat> {
        let mut mat = Mat::zeros(usize_to_i32(rows.len())?, usize_to_i32(N)?, CV_64F)?.to_mat()?;
        for (i, row) in rows.enumerate() {
            let i = usize_to_i32(i)?;
            for (j, value) in row.iter().enumerate() {
                *mat.at_2d_mut::<f64>(i, usize_to_i32(j)?)? = *value;
            }
        }
        Ok(mat)
    }

    fn camera_matrix(intrinsics: &CameraIntrinsics) -> Result<Mat> {
        let k = intrinsics.matrix();
        Self::points_to_mat((0..3).map(|r| [k[(r, 0)], k[(r, 1)], k[(r, 2)]]))
    }

    fn mat_to_matrix3(mat: &Mat) -> Result<Matrix3<f64>> {
        if mat.rows() != 3 || mat.cols() != 3 {
            return Err(Error::PoseEstimation(format!(
                "Expected 3x3 rotation matrix, got {}x{}",
                mat.rows(),
                mat.cols()
            )));
        }
        let mut rotation = Matrix3::zeros();
        for r in 0..3 {
            for c in 0..3 {
                rotation[(r, c)] = *mat.at_2d::<f64>(usize_to_i32(r)?, usize_to_i32(c)?)?;
            }
        }
        Ok(rotation)
    }
}

impl PnpSolver for OpenCvPnpSolver {
    fn solve(
        &self,
        model_points: &[Point3<f64>],
        image_points: &[Point2<f64>],
        intrinsics: &CameraIntrinsics,
    ) -> Result<Option<RotationEstimate>> {
        if model_points.len() != image_points.len() {
            return Err(Error::InvalidInput(format!(
                "{} model points but {} image points",
                model_points.len(),
                image_points.len()
            )));
        }

        let object_points = Self::points_to_mat(model_points.iter().map(|p| [p.x, p.y, p.z]))?;
        let image_points = Self::points_to_mat(image_points.iter().map(|p| [p.x, p.y]))?;
        let camera_matrix = Self::camera_matrix(intrinsics)?;

        // Assume no lens distortion
        let dist_coeffs = Mat::zeros(4, 1, CV_64F)?.to_mat()?;

        let mut rvec = Mat::default();
        let mut tvec = Mat::default();
        let converged = calib3d::solve_pnp(
            &object_points,
            &image_points,
            &camera_matrix,
            &dist_coeffs,
            &mut rvec,
            &mut tvec,
            false,
            self.method,
        )?;
        if !converged {
            log::debug!("solvePnP did not converge");
            return Ok(None);
        }

        let mut rotation_matrix = Mat::default();
        calib3d::rodrigues(&rvec, &mut rotation_matrix, &mut Mat::default())?;

        Ok(Some(RotationEstimate {
            rotation: Self::mat_to_matrix3(&rotation_matrix)?,
            translation: Vector3::new(
                *tvec.at_2d::<f64>(0, 0)?,
                *tvec.at_2d::<f64>(1, 0)?,
                *tvec.at_2d::<f64>(2, 0)?,
            ),
        }))
    }
}

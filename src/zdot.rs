//! Complex matrix products on split real/imaginary storage.
//!
//! Every variant computes c = β·c + α·(a'·b') in place, where a' and b' are `a`
//! and `b`, optionally conjugated element-wise. Transposes are expressed by
//! passing `.t()` views.

use ndarray::linalg::general_mat_mul;
use ndarray::{ArrayView2, ArrayViewMut2};

/// Split-storage complex gemm with optional element-wise conjugation.
///
/// (aR + i·sa·aI)(bR + i·sb·bI) = aR·bR - sa·sb·aI·bI + i(sa·aI·bR + sb·aR·bI)
#[allow(clippy::too_many_arguments)]
pub fn zdot(
    conj_a: bool,
    conj_b: bool,
    alpha: f64,
    a_re: &ArrayView2<f64>,
    a_im: &ArrayView2<f64>,
    b_re: &ArrayView2<f64>,
    b_im: &ArrayView2<f64>,
    beta: f64,
    c_re: &mut ArrayViewMut2<f64>,
    c_im: &mut ArrayViewMut2<f64>,
) {
    let sa = if conj_a { -1.0 } else { 1.0 };
    let sb = if conj_b { -1.0 } else { 1.0 };

    general_mat_mul(alpha, a_re, b_re, beta, c_re);
    general_mat_mul(-sa * sb * alpha, a_im, b_im, 1.0, c_re);

    general_mat_mul(sa * alpha, a_im, b_re, beta, c_im);
    general_mat_mul(sb * alpha, a_re, b_im, 1.0, c_im);
}

#[allow(clippy::too_many_arguments)]
pub fn zdot_nn(
    alpha: f64,
    a_re: &ArrayView2<f64>,
    a_im: &ArrayView2<f64>,
    b_re: &ArrayView2<f64>,
    b_im: &ArrayView2<f64>,
    beta: f64,
    c_re: &mut ArrayViewMut2<f64>,
    c_im: &mut ArrayViewMut2<f64>,
) {
    zdot(false, false, alpha, a_re, a_im, b_re, b_im, beta, c_re, c_im)
}

/// c = β·c + α·a·conj(b)
#[allow(clippy::too_many_arguments)]
pub fn zdot_nc(
    alpha: f64,
    a_re: &ArrayView2<f64>,
    a_im: &ArrayView2<f64>,
    b_re: &ArrayView2<f64>,
    b_im: &ArrayView2<f64>,
    beta: f64,
    c_re: &mut ArrayViewMut2<f64>,
    c_im: &mut ArrayViewMut2<f64>,
) {
    zdot(false, true, alpha, a_re, a_im, b_re, b_im, beta, c_re, c_im)
}

/// c = β·c + α·conj(a)·b
#[allow(clippy::too_many_arguments)]
pub fn zdot_cn(
    alpha: f64,
    a_re: &ArrayView2<f64>,
    a_im: &ArrayView2<f64>,
    b_re: &ArrayView2<f64>,
    b_im: &ArrayView2<f64>,
    beta: f64,
    c_re: &mut ArrayViewMut2<f64>,
    c_im: &mut ArrayViewMut2<f64>,
) {
    zdot(true, false, alpha, a_re, a_im, b_re, b_im, beta, c_re, c_im)
}

#[allow(clippy::too_many_arguments)]
pub fn zdot_cc(
    alpha: f64,
    a_re: &ArrayView2<f64>,
    a_im: &ArrayView2<f64>,
    b_re: &ArrayView2<f64>,
    b_im: &ArrayView2<f64>,
    beta: f64,
    c_re: &mut ArrayViewMut2<f64>,
    c_im: &mut ArrayViewMut2<f64>,
) {
    zdot(true, true, alpha, a_re, a_im, b_re, b_im, beta, c_re, c_im)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::Array2;
    use num_complex::Complex64;
    use rand::Rng;

    fn random(rows: usize, cols: usize) -> Array2<f64> {
        let mut rng = rand::thread_rng();
        Array2::from_shape_fn((rows, cols), |_| rng.gen_range(-1.0..1.0))
    }

    fn reference(a: &Array2<Complex64>, b: &Array2<Complex64>) -> Array2<Complex64> {
        a.dot(b)
    }

    #[test]
    fn test_all_variants_match_complex_product() {
        let (a_re, a_im) = (random(3, 4), random(3, 4));
        let (b_re, b_im) = (random(4, 2), random(4, 2));
        let (c0_re, c0_im) = (random(3, 2), random(3, 2));

        let combine = |re: &Array2<f64>, im: &Array2<f64>, conj: bool| {
            let s = if conj { -1.0 } else { 1.0 };
            Array2::from_shape_fn(re.dim(), |ij| Complex64::new(re[ij], s * im[ij]))
        };
        let c0 = combine(&c0_re, &c0_im, false);

        for &(ca, cb) in [(false, false), (false, true), (true, false), (true, true)].iter() {
            let expected = reference(&combine(&a_re, &a_im, ca), &combine(&b_re, &b_im, cb))
                .mapv(|z| z * 0.5)
                + c0.mapv(|z| z * 2.0);

            let mut c_re = c0_re.clone();
            let mut c_im = c0_im.clone();
            let f = match (ca, cb) {
                (false, false) => zdot_nn,
                (false, true) => zdot_nc,
                (true, false) => zdot_cn,
                (true, true) => zdot_cc,
            };
            f(
                0.5,
                &a_re.view(),
                &a_im.view(),
                &b_re.view(),
                &b_im.view(),
                2.0,
                &mut c_re.view_mut(),
                &mut c_im.view_mut(),
            );
            for ij in [(0, 0), (1, 1), (2, 0), (2, 1)].iter() {
                assert_abs_diff_eq!(c_re[*ij], expected[*ij].re, epsilon = 1e-12);
                assert_abs_diff_eq!(c_im[*ij], expected[*ij].im, epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn test_transposed_views() {
        // a·conj(bᵀ) with bᵀ given as a view
        let (a_re, a_im) = (random(2, 3), random(2, 3));
        let (b_re, b_im) = (random(4, 3), random(4, 3));
        let mut c_re = Array2::zeros((2, 4));
        let mut c_im = Array2::zeros((2, 4));
        zdot_nc(
            1.0,
            &a_re.view(),
            &a_im.view(),
            &b_re.t(),
            &b_im.t(),
            0.0,
            &mut c_re.view_mut(),
            &mut c_im.view_mut(),
        );
        for i in 0..2 {
            for j in 0..4 {
                let mut z = Complex64::new(0.0, 0.0);
                for l in 0..3 {
                    z += Complex64::new(a_re[[i, l]], a_im[[i, l]])
                        * Complex64::new(b_re[[j, l]], -b_im[[j, l]]);
                }
                assert_abs_diff_eq!(c_re[[i, j]], z.re, epsilon = 1e-12);
                assert_abs_diff_eq!(c_im[[i, j]], z.im, epsilon = 1e-12);
            }
        }
    }
}

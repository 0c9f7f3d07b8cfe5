//! Face chip extraction via 4-DOF similarity transforms.
//!
//! Faces are warped into a square RGB chip of [`CHIP_SIZE`] pixels with
//! [`CHIP_PADDING`] of context on every side. With landmarks the transform
//! is a least-squares fit to a reference five-point layout; without them the
//! detection box is squared up and scaled into the chip.

use crate::types::{FaceLocation, Landmarks};
use image::{imageops, Rgb, RgbImage};
use rand::Rng;

/// Side length of the chip fed to the descriptor network.
pub const CHIP_SIZE: u32 = 150;
/// Context around the face, as a fraction of the face size, on each side.
pub const CHIP_PADDING: f32 = 0.25;

/// Five-point reference layout on a tight 112×112 face crop.
const REFERENCE_LANDMARKS_112: Landmarks = [
    (38.2946, 51.6963), // left eye
    (73.5318, 51.5014), // right eye
    (56.0252, 71.7366), // nose
    (41.5493, 92.3655), // left mouth
    (70.7299, 92.2041), // right mouth
];

// Jitter ranges: rotation in degrees, face scale, translation as a chip fraction.
const JITTER_MAX_ROTATION_DEG: f32 = 3.0;
const JITTER_MIN_SCALE: f32 = 0.97;
const JITTER_MAX_SCALE: f32 = 0.99999;
const JITTER_TRANSLATE: f32 = 0.02;

/// Similarity transform `z' = (a + ib)·z + (tx + i·ty)` from image to chip space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Similarity {
    pub a: f32,
    pub b: f32,
    pub tx: f32,
    pub ty: f32,
}

impl Similarity {
    pub const IDENTITY: Similarity = Similarity { a: 1.0, b: 0.0, tx: 0.0, ty: 0.0 };

    pub fn apply(&self, (x, y): (f32, f32)) -> (f32, f32) {
        (
            self.a * x - self.b * y + self.tx,
            self.b * x + self.a * y + self.ty,
        )
    }

    /// `self` followed by `then`.
    fn then(&self, then: &Similarity) -> Similarity {
        Similarity {
            a: then.a * self.a - then.b * self.b,
            b: then.a * self.b + then.b * self.a,
            tx: then.a * self.tx - then.b * self.ty + then.tx,
            ty: then.b * self.tx + then.a * self.ty + then.ty,
        }
    }

    /// Perturb the chip by rotating and scaling about its centre, then shifting.
    pub fn jittered(&self, jitter: &Jitter) -> Similarity {
        let c = CHIP_SIZE as f32 / 2.0;
        let (sin, cos) = jitter.rotation.sin_cos();
        let ka = jitter.scale * cos;
        let kb = jitter.scale * sin;
        let about_centre = Similarity {
            a: ka,
            b: kb,
            tx: c - (ka * c - kb * c) + jitter.shift.0,
            ty: c - (kb * c + ka * c) + jitter.shift.1,
        };
        self.then(&about_centre)
    }
}

/// One random perturbation of a face chip.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Jitter {
    /// Radians.
    pub rotation: f32,
    pub scale: f32,
    /// Pixels in chip space.
    pub shift: (f32, f32),
    pub mirror: bool,
}

impl Jitter {
    pub fn sample<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let max_rot = JITTER_MAX_ROTATION_DEG.to_radians();
        let max_shift = JITTER_TRANSLATE * CHIP_SIZE as f32;
        Self {
            rotation: rng.gen_range(-max_rot..=max_rot),
            scale: 1.0 / rng.gen_range(JITTER_MIN_SCALE..JITTER_MAX_SCALE),
            shift: (
                rng.gen_range(-max_shift..=max_shift),
                rng.gen_range(-max_shift..=max_shift),
            ),
            mirror: rng.gen_bool(0.5),
        }
    }
}

/// The reference layout moved into padded chip coordinates.
fn chip_reference() -> Landmarks {
    let inner = CHIP_SIZE as f32 / (1.0 + 2.0 * CHIP_PADDING);
    let offset = inner * CHIP_PADDING;
    REFERENCE_LANDMARKS_112.map(|(x, y)| (x / 112.0 * inner + offset, y / 112.0 * inner + offset))
}

/// Least-squares similarity transform taking `src` landmarks onto `dst`.
fn estimate_similarity_transform(src: &Landmarks, dst: &Landmarks) -> Similarity {
    // Normal equations for unknowns [a, b, tx, ty], two rows per point pair:
    //   [sx, -sy, 1, 0] · u = dx
    //   [sy,  sx, 0, 1] · u = dy
    // Accumulated in f64: the system is badly scaled for pixel coordinates.
    let mut ata = [[0.0f64; 4]; 4];
    let mut atb = [0.0f64; 4];

    for (&(sx, sy), &(dx, dy)) in src.iter().zip(dst.iter()) {
        let (sx, sy, dx, dy) = (sx as f64, sy as f64, dx as f64, dy as f64);
        let r1 = [sx, -sy, 1.0, 0.0];
        let r2 = [sy, sx, 0.0, 1.0];
        for j in 0..4 {
            for k in 0..4 {
                ata[j][k] += r1[j] * r1[k] + r2[j] * r2[k];
            }
            atb[j] += r1[j] * dx + r2[j] * dy;
        }
    }

    match solve_4x4(ata, atb) {
        Some([a, b, tx, ty]) => Similarity {
            a: a as f32,
            b: b as f32,
            tx: tx as f32,
            ty: ty as f32,
        },
        None => Similarity::IDENTITY,
    }
}

/// Gaussian elimination with partial pivoting; `None` when singular.
#[allow(clippy::needless_range_loop)]
fn solve_4x4(mut m: [[f64; 4]; 4], mut rhs: [f64; 4]) -> Option<[f64; 4]> {
    for col in 0..4 {
        let pivot_row = (col..4)
            .max_by(|&i, &j| m[i][col].abs().total_cmp(&m[j][col].abs()))
            .unwrap_or(col);
        m.swap(col, pivot_row);
        rhs.swap(col, pivot_row);

        let pivot = m[col][col];
        if pivot.abs() < 1e-12 {
            return None;
        }
        for row in (col + 1)..4 {
            let factor = m[row][col] / pivot;
            for j in col..4 {
                m[row][j] -= factor * m[col][j];
            }
            rhs[row] -= factor * rhs[col];
        }
    }

    let mut x = [0.0f64; 4];
    for i in (0..4).rev() {
        let tail: f64 = ((i + 1)..4).map(|j| m[i][j] * x[j]).sum();
        x[i] = (rhs[i] - tail) / m[i][i];
    }
    Some(x)
}

/// Transform that fits the five landmarks onto the chip reference layout.
pub fn landmark_transform(landmarks: &Landmarks) -> Similarity {
    estimate_similarity_transform(landmarks, &chip_reference())
}

/// Transform that squares up a detection box and fits it, padded, into the chip.
pub fn box_transform(loc: &FaceLocation) -> Similarity {
    let side = loc.width().max(loc.height()).max(1) as f32 * (1.0 + 2.0 * CHIP_PADDING);
    let cx = (loc.left + loc.right) as f32 / 2.0;
    let cy = (loc.top + loc.bottom) as f32 / 2.0;
    let scale = CHIP_SIZE as f32 / side;
    Similarity {
        a: scale,
        b: 0.0,
        tx: CHIP_SIZE as f32 / 2.0 - scale * cx,
        ty: CHIP_SIZE as f32 / 2.0 - scale * cy,
    }
}

/// Warp `image` into a chip through `transform`, bilinear sampling, black outside.
pub fn extract_chip(image: &RgbImage, transform: &Similarity) -> RgbImage {
    let det = transform.a * transform.a + transform.b * transform.b;
    if det < 1e-12 {
        return RgbImage::new(CHIP_SIZE, CHIP_SIZE);
    }
    let ia = transform.a / det;
    let ib = transform.b / det;
    let (w, h) = (image.width() as i64, image.height() as i64);

    let sample = |x: i64, y: i64| -> [f32; 3] {
        if x >= 0 && x < w && y >= 0 && y < h {
            let Rgb([r, g, b]) = *image.get_pixel(x as u32, y as u32);
            [r as f32, g as f32, b as f32]
        } else {
            [0.0; 3]
        }
    };

    RgbImage::from_fn(CHIP_SIZE, CHIP_SIZE, |ox, oy| {
        // inverse map: z = conj(k) · (z' - t) / |k|²
        let dx = ox as f32 - transform.tx;
        let dy = oy as f32 - transform.ty;
        let sx = ia * dx + ib * dy;
        let sy = -ib * dx + ia * dy;

        let x0 = sx.floor() as i64;
        let y0 = sy.floor() as i64;
        let fx = sx - x0 as f32;
        let fy = sy - y0 as f32;

        let tl = sample(x0, y0);
        let tr = sample(x0 + 1, y0);
        let bl = sample(x0, y0 + 1);
        let br = sample(x0 + 1, y0 + 1);

        let mut out = [0u8; 3];
        for c in 0..3 {
            let val = tl[c] * (1.0 - fx) * (1.0 - fy)
                + tr[c] * fx * (1.0 - fy)
                + bl[c] * (1.0 - fx) * fy
                + br[c] * fx * fy;
            out[c] = val.round().clamp(0.0, 255.0) as u8;
        }
        Rgb(out)
    })
}

/// Extract a jittered chip; mirrored chips are flipped horizontally.
pub fn extract_jittered_chip(image: &RgbImage, transform: &Similarity, jitter: &Jitter) -> RgbImage {
    let chip = extract_chip(image, &transform.jittered(jitter));
    if jitter.mirror {
        imageops::flip_horizontal(&chip)
    } else {
        chip
    }
}

//! Pure calculation functions for output dimensions.
//!
//! All functions here are pure and testable without any I/O or images.

use super::backend::Dimensions;
use super::params::ResizeBox;

/// Scale `value` by `num / den`, rounded, never below 1.
fn scale(value: u32, num: u32, den: u32) -> u32 {
    let scaled = (value as f64 * num as f64 / den as f64).round() as u32;
    scaled.max(1)
}

/// Calculate the output dimensions for resizing `source` into `target`.
///
/// Aspect ratio is preserved. Upscaling is allowed: a 100px-tall source asked
/// for height 400 comes out 400px tall.
///
/// Returns `None` when there is nothing to do: the box is unbounded or the
/// source has an unknown (zero) side.
///
/// # Examples
/// ```
/// # use image_versions::imaging::{Dimensions, ResizeBox, fit_within};
/// let src = Dimensions { width: 1200, height: 800 };
///
/// // height only → width follows
/// assert_eq!(
///     fit_within(src, ResizeBox::new(None, Some(400))),
///     Some(Dimensions { width: 600, height: 400 })
/// );
///
/// // box → the tighter side wins
/// assert_eq!(
///     fit_within(src, ResizeBox::new(Some(300), Some(300))),
///     Some(Dimensions { width: 300, height: 200 })
/// );
/// ```
pub fn fit_within(source: Dimensions, target: ResizeBox) -> Option<Dimensions> {
    let Dimensions {
        width: src_w,
        height: src_h,
    } = source;
    if src_w == 0 || src_h == 0 {
        return None;
    }

    let dims = match (target.width, target.height) {
        (None, None) => return None,
        (Some(w), None) => Dimensions {
            width: w,
            height: scale(src_h, w, src_w),
        },
        (None, Some(h)) => Dimensions {
            width: scale(src_w, h, src_h),
            height: h,
        },
        (Some(w), Some(h)) => {
            // Compare w/src_w against h/src_h without floats
            if w as u64 * src_h as u64 <= h as u64 * src_w as u64 {
                // Width is the binding side
                Dimensions {
                    width: w,
                    height: scale(src_h, w, src_w),
                }
            } else {
                Dimensions {
                    width: scale(src_w, h, src_h),
                    height: h,
                }
            }
        }
    };
    Some(dims)
}

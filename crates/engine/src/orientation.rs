use crate::geometry::{AffineTransform, Size};

/// Display orientation of a video track relative to its stored pixels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Orientation {
    #[default]
    Up,
    Down,
    /// Rotated a quarter turn counter-clockwise for display.
    Left,
    /// Rotated a quarter turn clockwise for display.
    Right,
}

/// Orientation plus the frame size a renderer must produce.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolvedOrientation {
    pub orientation: Orientation,
    pub is_portrait: bool,
    pub render_size: Size,
}

/// Classifies `transform` by exact coefficient match.
///
/// Only the four canonical quarter-turn matrices are recognized; anything else
/// (mirroring, shear, arbitrary angles) renders as `Up` at the natural size.
///
/// # Example
/// ```
/// use overlay_engine::{AffineTransform, Orientation, Size, resolve_orientation};
///
/// let resolved = resolve_orientation(
///     &AffineTransform::from_rotation_degrees(90),
///     Size::new(1920.0, 1080.0),
/// );
/// assert_eq!(resolved.orientation, Orientation::Right);
/// assert_eq!(resolved.render_size, Size::new(1080.0, 1920.0));
/// ```
pub fn resolve_orientation(transform: &AffineTransform, natural_size: Size) -> ResolvedOrientation {
    let (orientation, is_portrait) = match (transform.a, transform.b, transform.c, transform.d) {
        (a, b, c, d) if a == 0.0 && b == 1.0 && c == -1.0 && d == 0.0 => (Orientation::Right, true),
        (a, b, c, d) if a == 0.0 && b == -1.0 && c == 1.0 && d == 0.0 => (Orientation::Left, true),
        (a, b, c, d) if a == 1.0 && b == 0.0 && c == 0.0 && d == 1.0 => (Orientation::Up, false),
        (a, b, c, d) if a == -1.0 && b == 0.0 && c == 0.0 && d == -1.0 => {
            (Orientation::Down, false)
        }
        _ => (Orientation::Up, false),
    };

    let render_size = if is_portrait {
        natural_size.transposed()
    } else {
        natural_size
    };

    ResolvedOrientation {
        orientation,
        is_portrait,
        render_size,
    }
}

#[cfg(test)]
mod tests {
    use super::{Orientation, resolve_orientation};
    use crate::geometry::{AffineTransform, Size};

    const LANDSCAPE: Size = Size {
        width: 1920.0,
        height: 1080.0,
    };

    fn matrix(a: f64, b: f64, c: f64, d: f64) -> AffineTransform {
        AffineTransform {
            a,
            b,
            c,
            d,
            tx: 0.0,
            ty: 0.0,
        }
    }

    #[test]
    fn canonical_quarter_turns_are_recognized() {
        let cases = [
            (matrix(0.0, 1.0, -1.0, 0.0), Orientation::Right, true),
            (matrix(0.0, -1.0, 1.0, 0.0), Orientation::Left, true),
            (matrix(1.0, 0.0, 0.0, 1.0), Orientation::Up, false),
            (matrix(-1.0, 0.0, 0.0, -1.0), Orientation::Down, false),
        ];

        for (transform, orientation, portrait) in cases {
            let resolved = resolve_orientation(&transform, LANDSCAPE);
            assert_eq!(resolved.orientation, orientation);
            assert_eq!(resolved.is_portrait, portrait);
        }
    }

    #[test]
    fn portrait_swaps_render_size() {
        let resolved = resolve_orientation(&matrix(0.0, -1.0, 1.0, 0.0), LANDSCAPE);
        assert_eq!(resolved.render_size, Size::new(1080.0, 1920.0));

        let upside_down = resolve_orientation(&matrix(-1.0, 0.0, 0.0, -1.0), LANDSCAPE);
        assert_eq!(upside_down.render_size, LANDSCAPE);
    }

    #[test]
    fn translation_does_not_affect_classification() {
        let mut transform = AffineTransform::from_rotation_degrees(90);
        transform.tx = 1080.0;
        assert_eq!(
            resolve_orientation(&transform, LANDSCAPE).orientation,
            Orientation::Right
        );
    }

    #[test]
    fn non_canonical_transforms_fall_back_to_up() {
        for transform in [
            matrix(-1.0, 0.0, 0.0, 1.0),
            matrix(0.5, 0.5, -0.5, 0.5),
            AffineTransform::from_rotation_degrees(45),
        ] {
            let resolved = resolve_orientation(&transform, LANDSCAPE);
            assert_eq!(resolved.orientation, Orientation::Up);
            assert!(!resolved.is_portrait);
            assert_eq!(resolved.render_size, LANDSCAPE);
        }
    }

    #[test]
    fn probed_rotations_map_to_orientations() {
        assert_eq!(
            resolve_orientation(&AffineTransform::from_rotation_degrees(270), LANDSCAPE)
                .orientation,
            Orientation::Left
        );
        assert_eq!(
            resolve_orientation(&AffineTransform::from_rotation_degrees(180), LANDSCAPE)
                .orientation,
            Orientation::Down
        );
    }
}

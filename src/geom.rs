use cgmath::prelude::*;
use cgmath::{Point2, Vector2};

/// An axis-aligned bounding box
///
/// This is used in public interfaces, as a means to communicate object
/// placement to the grid.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Bounds<Point> {
    pub min: Point,
    pub max: Point,
}

impl<Point> Bounds<Point>
where
    Point: EuclideanSpace + Copy,
{
    pub fn new(min: Point, max: Point) -> Self {
        Self { min, max }
    }

    pub fn size(self) -> Point::Diff {
        self.max - self.min
    }
}

impl<S> Bounds<Point2<S>>
where
    S: cgmath::BaseNum,
{
    /// The box covering `center ± extent` on each axis
    pub fn around(center: Point2<S>, extent: Vector2<S>) -> Self {
        Self {
            min: center - extent,
            max: center + extent,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn around_expands_by_half_extent() {
        let bounds = Bounds::around(Point2::new(4.0f32, 6.0), Vector2::new(1.0, 2.0));
        assert_eq!(bounds, Bounds::new(Point2::new(3.0, 4.0), Point2::new(5.0, 8.0)));
        assert_eq!(bounds.size(), Vector2::new(2.0, 4.0));
    }
}

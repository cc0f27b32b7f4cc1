use std::ops::{Add, Sub};

/// Image-space point. Landmarks arrive as integers from most predictors but
/// the alignment math works in floating point.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn norm(&self) -> f64 {
        self.x.hypot(self.y)
    }

    pub fn distance(&self, other: &Point) -> f64 {
        (*self - *other).norm()
    }

    /// Snaps to the integer pixel grid.
    pub fn rounded(&self) -> Point {
        Point::new(self.x.round(), self.y.round())
    }
}

impl Add for Point {
    type Output = Point;

    fn add(self, rhs: Point) -> Point {
        Point::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Point {
    type Output = Point;

    fn sub(self, rhs: Point) -> Point {
        Point::new(self.x - rhs.x, self.y - rhs.y)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Size {
    pub width: i32,
    pub height: i32,
}

impl Size {
    pub const fn new(width: i32, height: i32) -> Self {
        Self { width, height }
    }

    pub fn square(side: i32) -> Self {
        Self::new(side, side)
    }

    pub fn is_empty(&self) -> bool {
        self.width <= 0 || self.height <= 0
    }
}

/// Axis-aligned integer rectangle in image coordinates.
///
/// `width` and `height` are never negative once a rectangle has passed
/// through [`Rect::intersection`] or [`double_rect_size`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Rect {
    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn from_size(size: Size) -> Self {
        Self::new(0, 0, size.width, size.height)
    }

    pub fn right(&self) -> i32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> i32 {
        self.y + self.height
    }

    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }

    pub fn area(&self) -> i64 {
        if self.is_empty() {
            return 0;
        }
        self.width as i64 * self.height as i64
    }

    pub fn is_empty(&self) -> bool {
        self.width <= 0 || self.height <= 0
    }

    /// Integer center, `(x + w/2, y + h/2)`.
    pub fn center(&self) -> (i32, i32) {
        (self.x + self.width / 2, self.y + self.height / 2)
    }

    pub fn contains(&self, (px, py): (i32, i32)) -> bool {
        px >= self.x && px < self.right() && py >= self.y && py < self.bottom()
    }

    /// Overlapping part of both rectangles; the zero rectangle when disjoint.
    pub fn intersection(&self, other: &Rect) -> Rect {
        let x1 = self.x.max(other.x);
        let y1 = self.y.max(other.y);
        let x2 = self.right().min(other.right());
        let y2 = self.bottom().min(other.bottom());
        if x2 <= x1 || y2 <= y1 {
            return Rect::default();
        }
        Rect::new(x1, y1, x2 - x1, y2 - y1)
    }

    pub fn overlaps(&self, other: &Rect) -> bool {
        self.intersection(other).area() > 0
    }

    /// Smallest rectangle covering both. Empty inputs are ignored.
    pub fn union(&self, other: &Rect) -> Rect {
        if self.is_empty() {
            return *other;
        }
        if other.is_empty() {
            return *self;
        }
        let x1 = self.x.min(other.x);
        let y1 = self.y.min(other.y);
        let x2 = self.right().max(other.right());
        let y2 = self.bottom().max(other.bottom());
        Rect::new(x1, y1, x2 - x1, y2 - y1)
    }

    pub fn translated(&self, dx: i32, dy: i32) -> Rect {
        Rect::new(self.x + dx, self.y + dy, self.width, self.height)
    }

    /// Grows every side by the given amounts (negative amounts shrink).
    pub fn inflated(&self, dx: i32, dy: i32) -> Rect {
        Rect::new(
            self.x - dx,
            self.y - dy,
            self.width + 2 * dx,
            self.height + 2 * dy,
        )
    }

    pub fn clipped_to(&self, size: Size) -> Rect {
        self.intersection(&Rect::from_size(size))
    }

    /// Half-size rectangle sharing this rectangle's center.
    pub fn centered_half(&self) -> Rect {
        let width = self.width / 2;
        let height = self.height / 2;
        Rect::new(self.x + width / 2, self.y + height / 2, width, height)
    }

    /// Per-axis rescale, truncating toward zero.
    pub fn scaled(&self, rx: f64, ry: f64) -> Rect {
        Rect::new(
            (self.x as f64 * rx) as i32,
            (self.y as f64 * ry) as i32,
            (self.width as f64 * rx) as i32,
            (self.height as f64 * ry) as i32,
        )
    }
}

/// Twice the input size around the same center, clipped to `[0, frame_size]`.
///
/// Clipping shrinks whichever edge crosses the frame and never shifts the
/// opposite edge, so the input center stays inside the result.
pub fn double_rect_size(rect: &Rect, frame_size: Size) -> Rect {
    let mut out = Rect::new(
        rect.x - rect.width / 2,
        rect.y - rect.height / 2,
        rect.width * 2,
        rect.height * 2,
    );

    if out.x < 0 {
        out.width += out.x;
        out.x = 0;
    }
    if out.y < 0 {
        out.height += out.y;
        out.y = 0;
    }
    if out.right() > frame_size.width {
        out.width = frame_size.width - out.x;
    }
    if out.bottom() > frame_size.height {
        out.height = frame_size.height - out.y;
    }

    out.width = out.width.max(0);
    out.height = out.height.max(0);
    out
}

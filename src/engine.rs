//! The exemplar-based fill engine.
//!
//! Implements the Criminisi, Perez, Toyama object-removal scheme (CVPR
//! 2003): fill the hole from its boundary inward, at each step picking the
//! boundary pixel whose patch has the highest priority (confidence times
//! isophote strength), then cloning the best-matching fully-known patch
//! over it. All scoring runs in scaled integer arithmetic; a freshly known
//! pixel carries full confidence 2048.

use crate::{
    errors::{Error, InvalidRange},
    frame::{FrameMut, MaskRef, PixelLayout},
    Dims,
};
use log::debug;

/// Confidence of an originally-known pixel, scaled so the window average
/// stays in integer range.
const FULL_CONFIDENCE: i32 = 2048;

/// Per-pixel classification grid. `Eroded`/`ErodedNext` are transient
/// states used by radius estimation and mask dilation; between runs and
/// between fill steps every pixel is `Source`, `Target` or `Boundary`.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum Mark {
    Source,
    Target,
    Boundary,
    Eroded,
    ErodedNext,
}

/// Which directions to grow the mask by one pixel before filling. Useful
/// when the mask was drawn slightly inside the object to remove.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Dilate {
    None,
    Horizontal,
    Vertical,
    Both,
}

impl Dilate {
    fn horizontal(self) -> bool {
        matches!(self, Self::Horizontal | Self::Both)
    }

    fn vertical(self) -> bool {
        matches!(self, Self::Vertical | Self::Both)
    }
}

/// Per-run tuning knobs.
#[derive(Clone, Debug)]
pub struct RunParams {
    /// Half-width of the comparison window, in pixels. The full window
    /// spans `2 * window_x` columns.
    pub window_x: i32,
    /// Half-height of the comparison window.
    pub window_y: i32,
    /// Donor search radius around each hole pixel. `0` estimates one from
    /// the hole thickness, negative searches the whole frame.
    pub radius: i32,
    /// The exact color marking hole pixels in the mask: `0xRRGGBB` for RGB
    /// layouts, `0xYYUUVV` for YUV ones. Ignored for the alpha-mask layout.
    pub mask_color: u32,
    pub dilate: Dilate,
    /// Upper bound on fill steps; the run stops early once reached.
    pub max_steps: i32,
}

impl Default for RunParams {
    fn default() -> Self {
        Self {
            window_x: 4,
            window_y: 4,
            radius: 0,
            mask_color: 0x00FF_FFFF,
            dilate: Dilate::None,
            max_steps: 100_000,
        }
    }
}

/// Bounding rectangle of the hole, both ends inclusive. Starts inverted so
/// the scan loops are empty when there is no hole at all.
struct Rect {
    top: i32,
    bottom: i32,
    left: i32,
    right: i32,
}

/// A boundary pixel cached as the current highest-priority fill site.
#[derive(Clone, Copy)]
struct BestBoundary {
    pri: i32,
    x: i32,
    y: i32,
}

/// Reusable fill state for frames of one size and layout.
///
/// The grids are allocated once in [`Engine::new`] and reinitialized by
/// every [`Engine::run`], so a video filter can keep one engine per clip.
pub struct Engine {
    width: i32,
    height: i32,
    layout: PixelLayout,
    /// Source/target/boundary classification, row-major.
    mark: Vec<Mark>,
    /// Scaled confidence per pixel, 0 for hole pixels.
    confid: Vec<i32>,
    /// Cached priority, meaningful at boundary pixels only.
    pri: Vec<i32>,
    /// Whether a full donor window around this pixel is available.
    source_ok: Vec<bool>,
    /// Brightness snapshot for packed layouts. Empty for planar frames,
    /// whose Y plane is read directly so it stays live as pixels fill in.
    gray: Vec<u8>,
    winx: i32,
    winy: i32,
    radius: i32,
    rect: Rect,
    best: Option<BestBoundary>,
}

impl Engine {
    pub fn new(dims: Dims, layout: PixelLayout) -> Result<Self, Error> {
        for &(value, name) in [(dims.width, "width"), (dims.height, "height")].iter() {
            if value < 2 || value > (1 << 15) {
                return Err(Error::InvalidRange(InvalidRange {
                    min: 2,
                    max: 1 << 15,
                    value: i64::from(value),
                    name,
                }));
            }
        }

        let len = (dims.width * dims.height) as usize;
        Ok(Self {
            width: dims.width as i32,
            height: dims.height as i32,
            layout,
            mark: vec![Mark::Source; len],
            confid: vec![0; len],
            pri: vec![0; len],
            source_ok: vec![false; len],
            gray: if layout.is_planar() {
                Vec::new()
            } else {
                vec![0; len]
            },
            winx: 0,
            winy: 0,
            radius: 0,
            rect: Rect {
                top: 0,
                bottom: 0,
                left: 0,
                right: 0,
            },
            best: None,
        })
    }

    pub fn dims(&self) -> Dims {
        Dims::new(self.width as u32, self.height as u32)
    }

    pub fn layout(&self) -> PixelLayout {
        self.layout
    }

    /// Fills the masked region of `frame` in place.
    ///
    /// Returns the number of fill steps executed. `Ok(0)` means the mask
    /// selected nothing. A negative count means the run aborted at that
    /// step because the hole had no usable boundary, which happens when
    /// the mask covers the entire frame; the pixel data is left untouched
    /// in that case.
    pub fn run(
        &mut self,
        frame: &mut FrameMut<'_>,
        mask: Option<&MaskRef<'_>>,
        params: &RunParams,
    ) -> Result<i32, Error> {
        if frame.layout() != self.layout {
            return Err(Error::LayoutMismatch {
                engine: self.layout,
                frame: frame.layout(),
            });
        }
        frame.check_dims(self.dims())?;
        match mask {
            Some(m) if self.layout.needs_mask() => m.check_dims(self.layout, self.dims())?,
            Some(_) => return Err(Error::UnexpectedMask(self.layout)),
            None if self.layout.needs_mask() => return Err(Error::MissingMask(self.layout)),
            None => {}
        }
        let max_win = i64::from(self.width.min(self.height)) / 2;
        for &(value, name) in [
            (i64::from(params.window_x), "window_x"),
            (i64::from(params.window_y), "window_y"),
        ]
        .iter()
        {
            if value < 1 || value > max_win {
                return Err(Error::InvalidRange(InvalidRange {
                    min: 1,
                    max: max_win,
                    value,
                    name,
                }));
            }
        }
        if params.max_steps < 0 {
            return Err(Error::InvalidRange(InvalidRange {
                min: 0,
                max: i64::from(i32::max_value()),
                value: i64::from(params.max_steps),
                name: "max_steps",
            }));
        }

        self.winx = params.window_x;
        self.winy = params.window_y;
        self.rect = Rect {
            top: self.height,
            bottom: 0,
            left: self.width,
            right: 0,
        };
        self.best = None;

        self.snapshot_gray(frame);
        self.classify_mask(frame, mask, params.mask_color);
        if params.dilate != Dilate::None {
            self.dilate_mask(params.dilate);
        }
        self.radius = params.radius;
        if self.radius == 0 {
            let estimated = self.estimate_radius();
            // widen the erosion estimate so thin masks still see texture
            self.radius = (estimated + 5).max(4 * self.winx.min(self.winy));
            debug!(
                "estimated search radius {} widened to {}",
                estimated, self.radius
            );
        }
        self.draw_boundary();
        self.scan_donors();

        for p in &mut self.pri {
            *p = 0;
        }
        for j in self.rect.top..=self.rect.bottom {
            for i in self.rect.left..=self.rect.right {
                if self.mark[self.at(i, j)] == Mark::Boundary {
                    let pri = self.priority(frame, i, j);
                    let idx = self.at(i, j);
                    self.pri[idx] = pri;
                }
            }
        }

        let mut count = 0;
        while self.target_exist() && count < params.max_steps {
            count += 1;
            if self.best.is_none() {
                self.best = self.highest_priority();
            }
            let best = match self.best {
                Some(b) => b,
                // no usable boundary, the mask is degenerate
                None => {
                    debug!("no boundary to fill from, aborting at step {}", count);
                    return Ok(-count);
                }
            };
            let donor = match self.donor_search(frame, best.x, best.y) {
                Some(d) => d,
                None => {
                    debug!("no donor patch found at step {}", count);
                    return Ok(count);
                }
            };
            let confid = self.window_confidence(best.x, best.y);
            self.apply_patch(frame, (best.x, best.y), donor, confid);
            self.update_boundary(best.x, best.y);
            self.best = self.update_priorities(frame, best.x, best.y, best.pri);
        }
        debug!("inpainted in {} steps", count);
        Ok(count)
    }

    #[inline]
    fn at(&self, x: i32, y: i32) -> usize {
        (y * self.width + x) as usize
    }

    #[inline]
    fn mark_at(&self, x: i32, y: i32) -> Mark {
        self.mark[self.at(x, y)]
    }

    /// Brightness at a pixel: the snapshot for packed layouts, the live Y
    /// plane for planar ones.
    #[inline]
    fn luma(&self, frame: &FrameMut<'_>, x: i32, y: i32) -> i32 {
        if self.gray.is_empty() {
            i32::from(frame.plane_luma(x, y))
        } else {
            i32::from(self.gray[self.at(x, y)])
        }
    }

    fn snapshot_gray(&mut self, frame: &FrameMut<'_>) {
        if self.layout.is_planar() {
            return;
        }
        for y in 0..self.height {
            for x in 0..self.width {
                let idx = self.at(x, y);
                self.gray[idx] = frame.derived_luma(x, y);
            }
        }
    }

    /// Seeds the mark and confidence grids from the mask: matching pixels
    /// become the hole, everything else is known texture.
    fn classify_mask(&mut self, frame: &FrameMut<'_>, mask: Option<&MaskRef<'_>>, color: u32) {
        for y in 0..self.height {
            for x in 0..self.width {
                let masked = match mask {
                    // alpha channel doubles as the mask, thresholded
                    None => frame.alpha(x, y) > 127,
                    Some(m) => m.color_key(self.layout, x, y) == color,
                };
                let idx = self.at(x, y);
                if masked {
                    self.mark[idx] = Mark::Target;
                    self.confid[idx] = 0;
                } else {
                    self.mark[idx] = Mark::Source;
                    self.confid[idx] = FULL_CONFIDENCE;
                }
            }
        }
    }

    /// Grows the hole by one pixel in the requested directions. `Eroded`
    /// stands in for "newly dilated" here so grown pixels don't cascade
    /// within the same pass.
    fn dilate_mask(&mut self, dilate: Dilate) {
        let (w, h) = (self.width, self.height);
        if dilate.horizontal() {
            for y in 0..h {
                for x in 0..w {
                    if self.mark_at(x, y) == Mark::Source
                        && ((x > 0 && self.mark_at(x - 1, y) == Mark::Target)
                            || (x + 1 < w && self.mark_at(x + 1, y) == Mark::Target))
                    {
                        let idx = self.at(x, y);
                        self.mark[idx] = Mark::Eroded;
                    }
                }
            }
        }
        if dilate.vertical() {
            for y in 0..h {
                for x in 0..w {
                    if self.mark_at(x, y) == Mark::Source
                        && ((y > 0 && self.mark_at(x, y - 1) == Mark::Target)
                            || (y + 1 < h && self.mark_at(x, y + 1) == Mark::Target))
                    {
                        let idx = self.at(x, y);
                        self.mark[idx] = Mark::Eroded;
                    }
                }
            }
        }
        for m in &mut self.mark {
            if *m == Mark::Eroded {
                *m = Mark::Target;
            }
        }
    }

    /// Estimates the hole thickness by eroding it one ring per round until
    /// nothing is left; the round count approximates how far a donor search
    /// must reach. The grid is restored to source/target afterwards.
    fn estimate_radius(&mut self) -> i32 {
        let (w, h) = (self.width, self.height);
        let mut rounds = 0;
        loop {
            rounds += 1;
            let mut targets = false;
            let mut eroded = false;
            for y in 0..h {
                for x in 0..w {
                    if self.mark_at(x, y) != Mark::Target {
                        continue;
                    }
                    targets = true;
                    let exposed = |m: Mark| m == Mark::Source || m == Mark::Eroded;
                    if (x > 0 && exposed(self.mark_at(x - 1, y)))
                        || (x + 1 < w && exposed(self.mark_at(x + 1, y)))
                        || (y > 0 && exposed(self.mark_at(x, y - 1)))
                        || (y + 1 < h && exposed(self.mark_at(x, y + 1)))
                    {
                        let idx = self.at(x, y);
                        self.mark[idx] = Mark::ErodedNext;
                        eroded = true;
                    }
                }
            }
            for m in &mut self.mark {
                if *m == Mark::ErodedNext {
                    *m = Mark::Eroded;
                }
            }
            // the empty final round counts, matching the erosion depth.
            // a mask with no source anywhere never erodes, bail out.
            if !targets || !eroded {
                break;
            }
        }
        for m in &mut self.mark {
            if *m == Mark::Eroded {
                *m = Mark::Target;
            }
        }
        rounds
    }

    /// Finds the hole's bounding rectangle and marks its initial boundary:
    /// hole pixels touching known texture or the frame edge. When the mask
    /// covers the whole frame there is nothing to fill from, so no boundary
    /// is drawn and the run will abort with a negative step count.
    fn draw_boundary(&mut self) {
        let (w, h) = (self.width, self.height);
        let any_source = self.mark.iter().any(|m| *m == Mark::Source);
        for j in 0..h {
            for i in 0..w {
                if self.mark_at(i, j) != Mark::Target {
                    continue;
                }
                self.rect.left = self.rect.left.min(i);
                self.rect.right = self.rect.right.max(i);
                self.rect.top = self.rect.top.min(j);
                self.rect.bottom = self.rect.bottom.max(j);
                if any_source
                    && (j == 0
                        || j == h - 1
                        || i == 0
                        || i == w - 1
                        || self.mark_at(i, j - 1) == Mark::Source
                        || self.mark_at(i - 1, j) == Mark::Source
                        || self.mark_at(i + 1, j) == Mark::Source
                        || self.mark_at(i, j + 1) == Mark::Source)
                {
                    let idx = self.at(i, j);
                    self.mark[idx] = Mark::Boundary;
                }
            }
        }
    }

    /// Marks every pixel whose full window lies inside the frame and
    /// contains only known texture as a donor candidate. Computed once per
    /// run; freshly filled pixels never become donors within the same run.
    fn scan_donors(&mut self) {
        let (w, h) = (self.width, self.height);
        let (wx, wy) = (self.winx, self.winy);
        for j in 0..h {
            for i in 0..w {
                let idx = self.at(i, j);
                if i < wx || j < wy || i > w - wx || j > h - wy {
                    self.source_ok[idx] = false;
                    continue;
                }
                let mut all_source = true;
                'window: for y in j - wy..j + wy {
                    for x in i - wx..i + wx {
                        if self.mark_at(x, y) != Mark::Source {
                            all_source = false;
                            break 'window;
                        }
                    }
                }
                self.source_ok[idx] = all_source;
            }
        }
    }

    /// Average confidence over the window at `(i, j)`, divided by the full
    /// unclipped window area so border pixels score lower.
    fn window_confidence(&self, i: i32, j: i32) -> i32 {
        let mut sum: i64 = 0;
        for y in (j - self.winy).max(0)..(j + self.winy).min(self.height) {
            for x in (i - self.winx).max(0)..(i + self.winx).min(self.width) {
                sum += i64::from(self.confid[self.at(x, y)]);
            }
        }
        (sum / i64::from(4 * self.winx * self.winy)) as i32
    }

    /// Two-point brightness gradient, scaled by 2 so it stays integer.
    /// Frame edges fall back to single differences.
    fn gradient(&self, frame: &FrameMut<'_>, i: i32, j: i32) -> (i32, i32) {
        let g = |x, y| self.luma(frame, x, y);
        if i == 0 && j == 0 {
            ((g(1, 0) - g(0, 0)) * 2, (g(0, 1) - g(0, 0)) * 2)
        } else if i == 0 {
            (
                (g(1, j) - g(0, j)) + (g(1, j - 1) - g(0, j - 1)),
                (g(0, j) - g(0, j - 1)) * 2,
            )
        } else if j == 0 {
            (
                (g(i, 0) - g(i - 1, 0)) * 2,
                (g(i, 1) - g(i, 0)) + (g(i - 1, 1) - g(i - 1, 0)),
            )
        } else {
            (
                (g(i, j) - g(i - 1, j)) + (g(i, j - 1) - g(i - 1, j - 1)),
                (g(i, j) - g(i, j - 1)) + (g(i - 1, j) - g(i - 1, j - 1)),
            )
        }
    }

    /// Normal of the hole boundary at `(i, j)`, scaled by 256: the
    /// perpendicular to the line through the first two boundary neighbors
    /// in the 3x3 ring. With fewer than two neighbors the direction is
    /// unknowable, so a fixed unit-ish vector keeps the fill moving.
    fn boundary_normal(&self, i: i32, j: i32) -> (i32, i32) {
        let mut first = None;
        let mut second = None;
        'ring: for y in (j - 1).max(0)..=(j + 1).min(self.height - 1) {
            for x in (i - 1).max(0)..=(i + 1).min(self.width - 1) {
                if x == i && y == j {
                    continue;
                }
                if self.mark_at(x, y) == Mark::Boundary {
                    if first.is_none() {
                        first = Some((x, y));
                    } else {
                        second = Some((x, y));
                        break 'ring;
                    }
                }
            }
        }
        match (first, second) {
            (Some(a), Some(b)) => {
                let nx = b.1 - a.1;
                let ny = b.0 - a.0;
                let len = f64::from(nx * nx + ny * ny).sqrt();
                (
                    (f64::from(nx) * 256.0 / len) as i32,
                    (f64::from(ny) * 256.0 / len) as i32,
                )
            }
            _ => (181, 182),
        }
    }

    /// Data term: strength of the strongest isophote in the window,
    /// projected onto the boundary normal. Only gradients measured fully
    /// inside known texture count, a hole neighbor would fake a huge jump.
    fn data_term(&self, frame: &FrameMut<'_>, i: i32, j: i32) -> i32 {
        let (w, h) = (self.width, self.height);
        let mut grad = (0, 0);
        let mut strongest = 0;
        for y in (j - self.winy).max(0)..(j + self.winy).min(h) {
            for x in (i - self.winx).max(0)..(i + self.winx).min(w) {
                if self.mark_at(x, y) != Mark::Source {
                    continue;
                }
                if (x + 1 < w && self.mark_at(x + 1, y) != Mark::Source)
                    || (x > 0 && self.mark_at(x - 1, y) != Mark::Source)
                    || (y + 1 < h && self.mark_at(x, y + 1) != Mark::Source)
                    || (y > 0 && self.mark_at(x, y - 1) != Mark::Source)
                {
                    continue;
                }
                let g = self.gradient(frame, x, y);
                let magnitude = g.0 * g.0 + g.1 * g.1;
                if magnitude > strongest {
                    grad = g;
                    strongest = magnitude;
                }
            }
        }
        // isophote runs perpendicular to the gradient
        let iso = (grad.1, -grad.0);
        let normal = self.boundary_normal(i, j);
        (normal.0 * iso.0 + normal.1 * iso.1).abs()
    }

    fn priority(&self, frame: &FrameMut<'_>, i: i32, j: i32) -> i32 {
        self.window_confidence(i, j) * self.data_term(frame, i, j)
    }

    fn target_exist(&self) -> bool {
        for j in self.rect.top..=self.rect.bottom {
            for i in self.rect.left..=self.rect.right {
                if self.mark_at(i, j) != Mark::Source {
                    return true;
                }
            }
        }
        false
    }

    /// Full scan of the hole's bounding rectangle for the best boundary
    /// pixel. Only needed when the incremental update after the previous
    /// step didn't yield a new maximum.
    fn highest_priority(&self) -> Option<BestBoundary> {
        let mut best: Option<BestBoundary> = None;
        for j in self.rect.top..=self.rect.bottom {
            for i in self.rect.left..=self.rect.right {
                if self.mark_at(i, j) != Mark::Boundary {
                    continue;
                }
                let pri = self.pri[self.at(i, j)];
                if best.map_or(true, |b| pri > b.pri) {
                    best = Some(BestBoundary { pri, x: i, y: j });
                }
            }
        }
        best
    }

    /// Finds the donor patch with the lowest masked SAD against the window
    /// at `(x, y)`. Only pixels already known at the target participate in
    /// the comparison. Ties keep the first candidate in scan order.
    fn donor_search(&self, frame: &FrameMut<'_>, x: i32, y: i32) -> Option<(i32, i32)> {
        let (w, h) = (self.width, self.height);
        let (ymin, ymax, xmin, xmax) = if self.radius > 0 {
            (
                (y - self.radius).max(0),
                (y + self.radius).min(h),
                (x - self.radius).max(0),
                (x + self.radius).min(w),
            )
        } else {
            (0, h, 0, w)
        };

        let mut best = None;
        // windows can cover billions of pixels, so the sum needs 64 bits
        let mut min = u64::max_value();
        for j in ymin..ymax {
            for i in xmin..xmax {
                if !self.source_ok[self.at(i, j)] {
                    continue;
                }
                let mut sum = 0u64;
                for iter_y in (-self.winy).max(-y)..self.winy.min(h - y) {
                    let sy = j + iter_y;
                    let ty = y + iter_y;
                    for iter_x in -self.winx..self.winx {
                        let tx = x + iter_x;
                        if tx < 0 || tx >= w {
                            continue;
                        }
                        if self.mark_at(tx, ty) == Mark::Source {
                            sum += u64::from(frame.sad((tx, ty), (i + iter_x, sy)));
                        }
                    }
                }
                if sum < min {
                    min = sum;
                    best = Some((i, j));
                }
            }
        }
        best
    }

    /// Clones the donor window over the target window, skipping pixels that
    /// are already known. Filled pixels become source with the confidence
    /// computed at the fill site.
    fn apply_patch(
        &mut self,
        frame: &mut FrameMut<'_>,
        target: (i32, i32),
        donor: (i32, i32),
        confid: i32,
    ) {
        let (w, h) = (self.width, self.height);
        for iter_y in (-self.winy).max(-target.1)..self.winy.min(h - target.1) {
            let y0 = donor.1 + iter_y;
            let y1 = target.1 + iter_y;
            for iter_x in (-self.winx).max(-target.0)..self.winx.min(w - target.0) {
                let x0 = donor.0 + iter_x;
                let x1 = target.0 + iter_x;
                let idx = self.at(x1, y1);
                if self.mark[idx] != Mark::Source {
                    self.mark[idx] = Mark::Source;
                    self.confid[idx] = confid;
                    if !self.gray.is_empty() {
                        let donor_gray = self.gray[self.at(x0, y0)];
                        self.gray[idx] = donor_gray;
                    }
                    frame.copy_pixel((x0, y0), (x1, y1));
                }
            }
        }
    }

    /// Redraws the boundary in the window around the filled patch plus a
    /// two-pixel apron: demote stale boundary marks to plain target, then
    /// re-mark hole pixels that now touch known texture or the frame edge.
    fn update_boundary(&mut self, i: i32, j: i32) {
        let (w, h) = (self.width, self.height);
        let ys = (j - self.winy - 2).max(0)..(j + self.winy + 2).min(h);
        let xs = (i - self.winx - 2).max(0)..(i + self.winx + 2).min(w);
        for y in ys.clone() {
            for x in xs.clone() {
                if self.mark_at(x, y) != Mark::Source {
                    let idx = self.at(x, y);
                    self.mark[idx] = Mark::Target;
                }
            }
        }
        for y in ys {
            for x in xs.clone() {
                if self.mark_at(x, y) == Mark::Target
                    && (y == 0
                        || y == h - 1
                        || x == 0
                        || x == w - 1
                        || self.mark_at(x, y - 1) == Mark::Source
                        || self.mark_at(x - 1, y) == Mark::Source
                        || self.mark_at(x + 1, y) == Mark::Source
                        || self.mark_at(x, y + 1) == Mark::Source)
                {
                    let idx = self.at(x, y);
                    self.mark[idx] = Mark::Boundary;
                }
            }
        }
    }

    /// Recomputes priorities in the window around the filled patch plus a
    /// three-pixel apron. If a recomputed priority reaches the previous
    /// maximum the new best is already known and the next step can skip
    /// the full rectangle scan.
    fn update_priorities(
        &mut self,
        frame: &FrameMut<'_>,
        i: i32,
        j: i32,
        mut ceiling: i32,
    ) -> Option<BestBoundary> {
        let mut found = None;
        for y in (j - self.winy - 3).max(0)..(j + self.winy + 3).min(self.height) {
            for x in (i - self.winx - 3).max(0)..(i + self.winx + 3).min(self.width) {
                if self.mark_at(x, y) != Mark::Boundary {
                    continue;
                }
                let pri = self.priority(frame, x, y);
                let idx = self.at(x, y);
                self.pri[idx] = pri;
                if pri >= ceiling {
                    ceiling = pri;
                    found = Some(BestBoundary { pri, x, y });
                }
            }
        }
        found
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine(w: u32, h: u32, layout: PixelLayout) -> Engine {
        Engine::new(Dims::new(w, h), layout).unwrap()
    }

    fn rgb24_frame(data: &mut [u8], w: u32) -> FrameMut<'_> {
        FrameMut::packed(PixelLayout::Rgb24, data, w as usize * 3)
    }

    #[test]
    fn mask_color_selects_targets() {
        let mut e = engine(4, 4, PixelLayout::Rgb24);
        let mut pixels = vec![10u8; 4 * 4 * 3];
        let frame = rgb24_frame(&mut pixels, 4);
        let mut mask = vec![0u8; 4 * 4 * 3];
        // pixel (2, 1) painted with the mask color
        let idx = (4 + 2) * 3;
        mask[idx] = 0xFF;
        mask[idx + 1] = 0xFF;
        mask[idx + 2] = 0xFF;
        let mask = MaskRef::packed(&mask, 4 * 3);

        e.classify_mask(&frame, Some(&mask), 0x00FF_FFFF);

        for y in 0..4 {
            for x in 0..4 {
                let expected = if (x, y) == (2, 1) {
                    Mark::Target
                } else {
                    Mark::Source
                };
                assert_eq!(e.mark_at(x, y), expected, "at ({}, {})", x, y);
                let confid = if expected == Mark::Target {
                    0
                } else {
                    FULL_CONFIDENCE
                };
                assert_eq!(e.confid[e.at(x, y)], confid);
            }
        }
    }

    #[test]
    fn alpha_channel_selects_targets() {
        let mut e = engine(3, 3, PixelLayout::RgbaAlphaMask);
        let mut pixels = vec![0u8; 3 * 3 * 4];
        // opaque enough to count as masked only at (1, 1)
        pixels[(3 + 1) * 4 + 3] = 200;
        // exactly at the threshold stays source
        pixels[3] = 127;
        let frame = FrameMut::packed(PixelLayout::RgbaAlphaMask, &mut pixels, 3 * 4);

        e.classify_mask(&frame, None, 0);

        assert_eq!(e.mark_at(1, 1), Mark::Target);
        assert_eq!(e.mark_at(0, 0), Mark::Source);
    }

    #[test]
    fn dilation_grows_isolated_target_by_its_four_neighbors() {
        let mut e = engine(5, 5, PixelLayout::Rgb24);
        let idx = e.at(2, 2);
        e.mark[idx] = Mark::Target;

        e.dilate_mask(Dilate::Both);

        for y in 0..5 {
            for x in 0..5 {
                let expected = if (x as i32 - 2).abs() + (y as i32 - 2).abs() <= 1 {
                    Mark::Target
                } else {
                    Mark::Source
                };
                assert_eq!(e.mark_at(x, y), expected, "at ({}, {})", x, y);
            }
        }
    }

    #[test]
    fn horizontal_dilation_leaves_vertical_neighbors_alone() {
        let mut e = engine(5, 5, PixelLayout::Rgb24);
        let idx = e.at(2, 2);
        e.mark[idx] = Mark::Target;

        e.dilate_mask(Dilate::Horizontal);

        assert_eq!(e.mark_at(1, 2), Mark::Target);
        assert_eq!(e.mark_at(3, 2), Mark::Target);
        assert_eq!(e.mark_at(2, 1), Mark::Source);
        assert_eq!(e.mark_at(2, 3), Mark::Source);
    }

    #[test]
    fn radius_estimate_counts_erosion_rounds_and_restores_marks() {
        let mut e = engine(7, 7, PixelLayout::Rgb24);
        // a single hole pixel erodes in one round plus the empty round
        let idx = e.at(3, 3);
        e.mark[idx] = Mark::Target;

        assert_eq!(e.estimate_radius(), 2);
        assert_eq!(e.mark_at(3, 3), Mark::Target);
        assert_eq!(e.mark_at(3, 2), Mark::Source);
    }

    #[test]
    fn radius_estimate_bails_out_when_nothing_erodes() {
        let mut e = engine(4, 4, PixelLayout::Rgb24);
        for m in &mut e.mark {
            *m = Mark::Target;
        }

        assert_eq!(e.estimate_radius(), 1);
        assert!(e.mark.iter().all(|m| *m == Mark::Target));
    }

    #[test]
    fn boundary_covers_hole_edge_and_frame_edge() {
        let mut e = engine(6, 6, PixelLayout::Rgb24);
        // 3x3 hole in the middle: ring is boundary, center stays target
        for y in 1..4 {
            for x in 1..4 {
                let idx = e.at(x, y);
                e.mark[idx] = Mark::Target;
            }
        }
        // and a hole pixel at the frame corner with no known neighbor scan
        let idx = e.at(5, 5);
        e.mark[idx] = Mark::Target;
        // the bounding rectangle starts inverted, as run() seeds it
        e.rect = Rect {
            top: 6,
            bottom: 0,
            left: 6,
            right: 0,
        };

        e.draw_boundary();

        assert_eq!(e.mark_at(1, 1), Mark::Boundary);
        assert_eq!(e.mark_at(2, 1), Mark::Boundary);
        assert_eq!(e.mark_at(2, 2), Mark::Target);
        assert_eq!(e.mark_at(5, 5), Mark::Boundary);
        assert_eq!(e.rect.left, 1);
        assert_eq!(e.rect.right, 5);
        assert_eq!(e.rect.top, 1);
        assert_eq!(e.rect.bottom, 5);
    }

    #[test]
    fn no_boundary_drawn_when_mask_covers_everything() {
        let mut e = engine(4, 4, PixelLayout::Rgb24);
        for m in &mut e.mark {
            *m = Mark::Target;
        }

        e.draw_boundary();

        assert!(e.mark.iter().all(|m| *m == Mark::Target));
        assert!(e.highest_priority().is_none());
    }

    #[test]
    fn donor_scan_requires_full_window_of_known_texture() {
        let mut e = engine(8, 8, PixelLayout::Rgb24);
        e.winx = 2;
        e.winy = 2;
        let idx = e.at(5, 5);
        e.mark[idx] = Mark::Target;

        e.scan_donors();

        // too close to the frame edge for a full window
        assert!(!e.source_ok[e.at(1, 1)]);
        // interior pixel with an all-source window
        assert!(e.source_ok[e.at(2, 2)]);
        // window overlaps the hole pixel
        assert!(!e.source_ok[e.at(4, 4)]);
    }

    #[test]
    fn interior_confidence_of_untouched_texture_is_full() {
        let mut e = engine(8, 8, PixelLayout::Rgb24);
        e.winx = 2;
        e.winy = 2;
        for c in &mut e.confid {
            *c = FULL_CONFIDENCE;
        }

        assert_eq!(e.window_confidence(4, 4), FULL_CONFIDENCE);
        // clipped window sums fewer pixels but divides by the full area
        assert!(e.window_confidence(0, 0) < FULL_CONFIDENCE);
    }

    #[test]
    fn each_patch_application_shrinks_the_unfilled_region() {
        let mut e = engine(8, 8, PixelLayout::Rgb24);
        e.winx = 1;
        e.winy = 1;
        e.radius = 8;
        e.rect = Rect {
            top: 8,
            bottom: 0,
            left: 8,
            right: 0,
        };
        let mut pixels = vec![100u8; 8 * 8 * 3];
        let mut frame = rgb24_frame(&mut pixels, 8);
        let mut mask = vec![0u8; 8 * 8 * 3];
        for &(x, y) in [(3, 3), (4, 3), (3, 4), (4, 4)].iter() {
            let idx = (y * 8 + x) * 3;
            mask[idx] = 0xFF;
            mask[idx + 1] = 0xFF;
            mask[idx + 2] = 0xFF;
        }
        let mask = MaskRef::packed(&mask, 8 * 3);
        e.classify_mask(&frame, Some(&mask), 0x00FF_FFFF);
        e.draw_boundary();
        e.scan_donors();

        let unfilled =
            |e: &Engine| e.mark.iter().filter(|m| **m != Mark::Source).count();
        let mut remaining = unfilled(&e);
        assert_eq!(remaining, 4);
        while remaining > 0 {
            let best = e.highest_priority().unwrap();
            let donor = e.donor_search(&frame, best.x, best.y).unwrap();
            let confid = e.window_confidence(best.x, best.y);
            e.apply_patch(&mut frame, (best.x, best.y), donor, confid);
            e.update_boundary(best.x, best.y);
            let now = unfilled(&e);
            assert!(now < remaining, "the unfilled region must shrink");
            remaining = now;
        }
    }

    #[test]
    fn lone_boundary_pixel_gets_fallback_normal() {
        let mut e = engine(5, 5, PixelLayout::Rgb24);
        let idx = e.at(2, 2);
        e.mark[idx] = Mark::Boundary;

        assert_eq!(e.boundary_normal(2, 2), (181, 182));
    }

    #[test]
    fn collinear_boundary_normal_is_perpendicular() {
        let mut e = engine(5, 5, PixelLayout::Rgb24);
        // horizontal boundary through row 2
        for x in 1..4 {
            let idx = e.at(x, 2);
            e.mark[idx] = Mark::Boundary;
        }

        // the normal to a horizontal boundary is vertical, scaled by 256
        let n = e.boundary_normal(2, 2);
        assert_eq!(n, (0, 256));
    }
}

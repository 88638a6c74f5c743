//! Construction of the named 2D path primitives. These flatten at
//! evaluation time using the detail level in effect, so the geometry
//! compiler only ever sees point/curve verbs.

use std::f64::consts::TAU;

use crate::types::scene::{PathData, PathVerb};

/// Regular n-gon, first vertex at the top, wound counter-clockwise.
pub fn regular_polygon(sides: u32, radius: f64) -> PathData {
    let sides = sides.max(3);
    let mut path = PathData { verbs: Vec::new(), closed: true };
    for i in 0..sides {
        let theta = TAU * f64::from(i) / f64::from(sides) + TAU / 4.0;
        path.push_point([radius * theta.cos(), radius * theta.sin()]);
    }
    path
}

/// Unit-diameter circle approximated at the given detail level.
pub fn circle(detail: u32) -> PathData {
    regular_polygon(detail.max(3), 0.5)
}

/// Unit square centered at the origin.
pub fn square() -> PathData {
    PathData {
        verbs: vec![
            PathVerb::Point([0.5, 0.5]),
            PathVerb::Point([-0.5, 0.5]),
            PathVerb::Point([-0.5, -0.5]),
            PathVerb::Point([0.5, -0.5]),
        ],
        closed: true,
    }
}

/// Unit square with rounded corners.
pub fn roundrect(radius: f64, detail: u32) -> PathData {
    let r = radius.clamp(0.0, 0.499);
    if r <= 0.0 {
        return square();
    }
    let segs = (detail / 4).max(1);
    let h = 0.5 - r;
    // corner centers, counter-clockwise from the top-right
    let corners = [
        ([h, h], 0.0),
        ([-h, h], TAU / 4.0),
        ([-h, -h], TAU / 2.0),
        ([h, -h], 3.0 * TAU / 4.0),
    ];
    let mut path = PathData { verbs: Vec::new(), closed: true };
    for (center, start) in corners {
        for i in 0..=segs {
            let theta = start + (TAU / 4.0) * f64::from(i) / f64::from(segs);
            path.push_point([center[0] + r * theta.cos(), center[1] + r * theta.sin()]);
        }
    }
    path
}

/// Open circular arc of `angle` radians, unit radius 0.5, starting at the
/// positive x axis.
pub fn arc(angle: f64, detail: u32) -> PathData {
    let segs = detail.max(2);
    let mut path = PathData { verbs: Vec::new(), closed: false };
    for i in 0..=segs {
        let theta = angle * f64::from(i) / f64::from(segs);
        path.push_point([0.5 * theta.cos(), 0.5 * theta.sin()]);
    }
    path
}

// ─── SVG path data ───────────────────────────────────────────────────────────

/// Parse an SVG path `d` string into path verbs. Supports M/L/H/V/Q/C/Z in
/// absolute and relative forms. The y axis is flipped to match the y-up
/// convention of the rest of the engine. Cubic segments are sampled into
/// line segments at the given detail; quadratics stay as curve verbs.
pub fn svg_path(d: &str, detail: u32) -> Result<PathData, String> {
    let mut scanner = SvgScanner::new(d);
    let mut path = PathData::default();
    let mut cur = [0.0f64, 0.0];
    let mut start = [0.0f64, 0.0];
    let mut closed = false;

    while let Some(cmd) = scanner.next_command()? {
        let rel = cmd.is_ascii_lowercase();
        match cmd.to_ascii_uppercase() {
            'M' => {
                let p = scanner.point(rel, cur)?;
                cur = p;
                start = p;
                path.push_point([p[0], -p[1]]);
                // subsequent implicit pairs are line-tos
                while scanner.peek_number() {
                    let p = scanner.point(rel, cur)?;
                    cur = p;
                    path.push_point([p[0], -p[1]]);
                }
            }
            'L' => {
                loop {
                    let p = scanner.point(rel, cur)?;
                    cur = p;
                    path.push_point([p[0], -p[1]]);
                    if !scanner.peek_number() { break; }
                }
            }
            'H' => {
                loop {
                    let x = scanner.number()?;
                    cur[0] = if rel { cur[0] + x } else { x };
                    path.push_point([cur[0], -cur[1]]);
                    if !scanner.peek_number() { break; }
                }
            }
            'V' => {
                loop {
                    let y = scanner.number()?;
                    cur[1] = if rel { cur[1] + y } else { y };
                    path.push_point([cur[0], -cur[1]]);
                    if !scanner.peek_number() { break; }
                }
            }
            'Q' => {
                loop {
                    let c = scanner.point(rel, cur)?;
                    let p = scanner.point(rel, cur)?;
                    path.verbs.push(PathVerb::Curve([c[0], -c[1]]));
                    path.push_point([p[0], -p[1]]);
                    cur = p;
                    if !scanner.peek_number() { break; }
                }
            }
            'C' => {
                let segs = detail.max(4);
                loop {
                    let c1 = scanner.point(rel, cur)?;
                    let c2 = scanner.point(rel, cur)?;
                    let p = scanner.point(rel, cur)?;
                    for i in 1..=segs {
                        let t = f64::from(i) / f64::from(segs);
                        let q = cubic_at(cur, c1, c2, p, t);
                        path.push_point([q[0], -q[1]]);
                    }
                    cur = p;
                    if !scanner.peek_number() { break; }
                }
            }
            'Z' => {
                cur = start;
                closed = true;
            }
            other => return Err(format!("unsupported svg path command `{other}`")),
        }
    }

    path.closed = closed;
    if !closed {
        path.detect_closed();
    }
    Ok(path)
}

fn cubic_at(p0: [f64; 2], c1: [f64; 2], c2: [f64; 2], p1: [f64; 2], t: f64) -> [f64; 2] {
    let u = 1.0 - t;
    let mut out = [0.0; 2];
    for i in 0..2 {
        out[i] = u * u * u * p0[i]
            + 3.0 * u * u * t * c1[i]
            + 3.0 * u * t * t * c2[i]
            + t * t * t * p1[i];
    }
    out
}

struct SvgScanner<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> SvgScanner<'a> {
    fn new(d: &'a str) -> Self {
        Self { bytes: d.as_bytes(), pos: 0 }
    }

    fn skip_separators(&mut self) {
        while self.pos < self.bytes.len()
            && matches!(self.bytes[self.pos], b' ' | b'\t' | b'\n' | b'\r' | b',')
        {
            self.pos += 1;
        }
    }

    fn next_command(&mut self) -> Result<Option<char>, String> {
        self.skip_separators();
        if self.pos >= self.bytes.len() {
            return Ok(None);
        }
        let ch = self.bytes[self.pos] as char;
        if ch.is_ascii_alphabetic() {
            self.pos += 1;
            Ok(Some(ch))
        } else {
            Err(format!("expected svg path command, found `{ch}`"))
        }
    }

    fn peek_number(&mut self) -> bool {
        self.skip_separators();
        self.pos < self.bytes.len()
            && matches!(self.bytes[self.pos], b'0'..=b'9' | b'-' | b'+' | b'.')
    }

    fn number(&mut self) -> Result<f64, String> {
        self.skip_separators();
        let begin = self.pos;
        if self.pos < self.bytes.len() && matches!(self.bytes[self.pos], b'-' | b'+') {
            self.pos += 1;
        }
        let mut seen_dot = false;
        while self.pos < self.bytes.len() {
            match self.bytes[self.pos] {
                b'0'..=b'9' => self.pos += 1,
                b'.' if !seen_dot => { seen_dot = true; self.pos += 1; }
                _ => break,
            }
        }
        let text = std::str::from_utf8(&self.bytes[begin..self.pos]).unwrap_or("");
        text.parse()
            .map_err(|_| format!("invalid number in svg path data at byte {begin}"))
    }

    fn point(&mut self, rel: bool, cur: [f64; 2]) -> Result<[f64; 2], String> {
        let x = self.number()?;
        let y = self.number()?;
        if rel { Ok([cur[0] + x, cur[1] + y]) } else { Ok([x, y]) }
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

//! Convex brushes built from plane-bounded sides.

use bitflags::bitflags;
use nalgebra::{Point3, Vector3};

use crate::bsp::Contents;
use crate::math::Bounds;
use crate::plane::{Plane, PlaneSide};
use crate::registry::PlaneRegistry;
use crate::winding::Winding;
use crate::{LogSink, Result};

bitflags! {
    /// Independent state bits of a brush side.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
    pub struct SideFlags: u8 {
        const TESTED = 1;
        /// The side has a winding and becomes an output face.
        const VISIBLE = 2;
        /// Added only so the brush expands correctly; never emitted.
        const BEVEL = 4;
        /// Texture matching has run for this side.
        const TEXTURED = 8;
        const CURVE = 16;
    }
}

/// Where a side came from, which decides how it gets textured.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SideSource {
    /// One of the six sides of the initial bounding brush.
    Bounds,
    /// Created when splitting by the plane of the given node.
    Node(usize),
    /// Created when splitting a brush along a face's edges.
    FaceSplit,
    /// Added by bevelling or origin brush construction.
    Generated,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Side {
    /// Index into the job's [`PlaneRegistry`].
    pub plane: usize,
    /// Texture info index; `None` until textured, and for sides no face covers.
    pub texinfo: Option<usize>,
    pub source: SideSource,
    pub winding: Option<Winding>,
    pub flags: SideFlags,
}

impl Side {
    pub fn new(plane: usize, source: SideSource) -> Self {
        Self {
            plane,
            texinfo: None,
            source,
            winding: None,
            flags: SideFlags::empty(),
        }
    }

    #[inline]
    pub fn is_bevel(&self) -> bool {
        self.flags.contains(SideFlags::BEVEL)
    }

    #[inline]
    pub fn is_textured(&self) -> bool {
        self.flags.contains(SideFlags::TEXTURED)
    }
}

/// Thresholds that differ between the split stages.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SplitParams {
    /// A brush reaching less than this past the plane is not split.
    pub plane_side_epsilon: f64,
    /// Pieces with coordinates beyond `±max_bounds` are bogus.
    pub max_bounds: f64,
}

impl SplitParams {
    /// Used while walking the node tree.
    pub const NODE: SplitParams = SplitParams {
        plane_side_epsilon: 0.1,
        max_bounds: 4096.0,
    };

    /// Used when splitting a brush along a face for texturing.
    pub const FACE: SplitParams = SplitParams {
        plane_side_epsilon: 0.2,
        max_bounds: 65535.0,
    };
}

/// A convex solid: the intersection of the half-spaces behind its sides.
#[derive(Debug, Clone, PartialEq)]
pub struct Brush {
    pub sides: Vec<Side>,
    pub bounds: Bounds,
    pub contents: Contents,
}

impl Brush {
    pub fn new(sides: Vec<Side>, contents: Contents) -> Self {
        Self {
            sides,
            bounds: Bounds::empty(),
            contents,
        }
    }

    /// Builds an axis-aligned box brush with windings.
    ///
    /// Sides are ordered `+x, +y, +z, -x, -y, -z`.
    pub fn from_bounds(
        registry: &mut PlaneRegistry,
        mins: &Point3<f64>,
        maxs: &Point3<f64>,
        contents: Contents,
        source: SideSource,
    ) -> Result<Self> {
        let mut sides = Vec::with_capacity(6);
        for i in 0..3 {
            let mut normal = Vector3::zeros();
            normal[i] = 1.0;
            sides.push(Side::new(registry.find_or_create(normal, maxs[i])?, source));
        }
        for i in 0..3 {
            let mut normal = Vector3::zeros();
            normal[i] = -1.0;
            sides.push(Side::new(registry.find_or_create(normal, -mins[i])?, source));
        }

        let mut brush = Self::new(sides, contents);
        brush.create_windings(registry, true)?;
        Ok(brush)
    }

    /// Recomputes every side's winding by clipping its plane's base winding
    /// by all other sides, then refreshes the bounds.
    pub fn create_windings(&mut self, registry: &PlaneRegistry, skip_bevels: bool) -> Result<()> {
        for i in 0..self.sides.len() {
            let plane = registry.get(self.sides[i].plane);
            let mut winding = Some(Winding::base_for_plane(&plane.normal(), plane.dist())?);

            for (j, other) in self.sides.iter().enumerate() {
                let Some(w) = winding.take() else {
                    break;
                };
                if i == j
                    || other.plane == (self.sides[i].plane ^ 1)
                    || (skip_bevels && other.is_bevel())
                {
                    winding = Some(w);
                    continue;
                }
                let clip_plane = registry.get(other.plane ^ 1);
                winding = w.chop(&clip_plane.normal(), clip_plane.dist(), 0.0)?;
            }

            let side = &mut self.sides[i];
            side.flags.set(SideFlags::VISIBLE, winding.is_some());
            side.winding = winding;
        }

        self.bound();
        Ok(())
    }

    /// Recomputes the bounding box from the side windings.
    pub fn bound(&mut self) {
        let mut bounds = Bounds::empty();
        for winding in self.sides.iter().filter_map(|s| s.winding.as_ref()) {
            for point in winding.points() {
                bounds.add_point(point);
            }
        }
        self.bounds = bounds;
    }

    /// Volume from tetrahedrons between a corner and every side winding.
    pub fn volume(&self, registry: &PlaneRegistry) -> f64 {
        let mut windings = self
            .sides
            .iter()
            .filter_map(|s| s.winding.as_ref().map(|w| (s.plane, w)))
            .peekable();

        let Some(corner) = windings.peek().and_then(|(_, w)| w.points().first().copied()) else {
            return 0.0;
        };

        let volume: f64 = windings
            .map(|(plane, winding)| {
                let height = -registry.get(plane).signed_distance(&corner);
                height * winding.area()
            })
            .sum();

        volume / 3.0
    }

    /// The side of `plane` the brush reaches furthest into.
    pub fn mostly_on_side(&self, plane: &Plane) -> PlaneSide {
        let mut max = 0.0;
        let mut side = PlaneSide::Front;

        for winding in self.sides.iter().filter_map(|s| s.winding.as_ref()) {
            for point in winding.points() {
                let d = plane.signed_distance(point);
                if d > max {
                    max = d;
                    side = PlaneSide::Front;
                }
                if -d > max {
                    max = -d;
                    side = PlaneSide::Back;
                }
            }
        }

        side
    }

    /// Splits the brush by a registry plane into `(front, back)`.
    ///
    /// Each piece keeps the sides that still have a winding on its side of
    /// the plane and gains a side on the split plane tagged with `source`.
    /// When the plane does not really cut the brush, the whole brush goes to
    /// the side it reaches into. Pieces with less than unit volume are
    /// dropped.
    pub fn split(
        &self,
        registry: &PlaneRegistry,
        plane_index: usize,
        source: SideSource,
        params: &SplitParams,
        log: &dyn LogSink,
    ) -> Result<(Option<Brush>, Option<Brush>)> {
        let plane = *registry.get(plane_index);

        let mut d_front: f64 = 0.0;
        let mut d_back: f64 = 0.0;
        for winding in self.sides.iter().filter_map(|s| s.winding.as_ref()) {
            for point in winding.points() {
                let d = plane.signed_distance(point);
                d_front = d_front.max(d);
                d_back = d_back.min(d);
            }
        }

        if d_front < params.plane_side_epsilon {
            return Ok((None, Some(self.clone())));
        }
        if d_back > -params.plane_side_epsilon {
            return Ok((Some(self.clone()), None));
        }

        let mut mid = Some(Winding::base_for_plane(&plane.normal(), plane.dist())?);
        for side in &self.sides {
            let Some(w) = mid.take() else {
                break;
            };
            let clip_plane = registry.get(side.plane ^ 1);
            mid = w.chop(&clip_plane.normal(), clip_plane.dist(), 0.0)?;
        }

        let mid = match mid {
            Some(w) if !w.is_tiny() => w,
            _ => {
                log.trace(format_args!("split: no split winding"));
                return Ok(match self.mostly_on_side(&plane) {
                    PlaneSide::Back => (None, Some(self.clone())),
                    _ => (Some(self.clone()), None),
                });
            }
        };

        if mid.is_huge() {
            log.warn(format_args!("split: huge split winding"));
        }

        let mut pieces = [
            Brush::new(Vec::with_capacity(self.sides.len() + 1), self.contents),
            Brush::new(Vec::with_capacity(self.sides.len() + 1), self.contents),
        ];

        for side in &self.sides {
            let Some(winding) = &side.winding else {
                continue;
            };
            let (front, back) = winding.clip(&plane.normal(), plane.dist(), 0.0)?;
            for (piece, clipped) in pieces.iter_mut().zip([front, back]) {
                if let Some(clipped) = clipped {
                    let mut new_side = side.clone();
                    new_side.winding = Some(clipped);
                    new_side.flags.remove(SideFlags::TESTED);
                    piece.sides.push(new_side);
                }
            }
        }

        let [front, back] = pieces.map(|mut piece| {
            piece.bound();
            if !piece.bounds.within(params.max_bounds) {
                log.trace(format_args!("split: bogus brush after clip"));
                return None;
            }
            if piece.sides.len() < 3 {
                log.trace(format_args!("split: fewer than 3 sides"));
                return None;
            }
            Some(piece)
        });

        let (mut front, mut back) = match (front, back) {
            (Some(front), Some(back)) => (front, back),
            (front, back) => {
                if front.is_none() && back.is_none() {
                    log.debug(format_args!("split: split removed brush"));
                } else {
                    log.debug(format_args!("split: split not on both sides"));
                }
                return Ok((
                    front.map(|_| self.clone()),
                    back.map(|_| self.clone()),
                ));
            }
        };

        // The front piece's new side faces back towards the plane, and vice versa.
        let mut front_side = Side::new(plane_index ^ 1, source);
        front_side.winding = Some(mid.reversed());
        front.sides.push(front_side);

        let mut back_side = Side::new(plane_index, source);
        back_side.winding = Some(mid);
        back.sides.push(back_side);

        let keep = |piece: Brush| {
            if piece.volume(registry) < 1.0 {
                log.trace(format_args!("split: tiny volume after clip"));
                None
            } else {
                Some(piece)
            }
        };

        Ok((keep(front), keep(back)))
    }
}

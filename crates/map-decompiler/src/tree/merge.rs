//! Pairwise merging of brushes that together form a convex solid.

use std::collections::VecDeque;

use crate::brush::{Brush, Side};
use crate::winding::BOGUS_RANGE;
use crate::Result;

use super::TreeDecompiler;

/// Bounding boxes closer than this are considered touching.
const MERGE_BOUNDS_MARGIN: f64 = 2.0;

/// Returns `true` if `brush` has a side on the inverse of `side`'s plane.
fn has_mirror(brush: &Brush, side: &Side) -> bool {
    brush.sides.iter().any(|s| s.plane == side.plane ^ 1)
}

impl TreeDecompiler<'_> {
    /// Merges brushes pairwise until a full pass merges nothing.
    pub(super) fn merge_brushes(&self, brushes: Vec<Brush>, model: usize) -> Result<Vec<Brush>> {
        let mut pending: VecDeque<Brush> = brushes.into();
        let mut total = 0;

        let kept = loop {
            self.cancel.check()?;

            let mut merged_this_pass = 0;
            let mut kept = Vec::with_capacity(pending.len());

            while let Some(first) = pending.pop_front() {
                let mut merged = None;
                for (j, other) in pending.iter().enumerate() {
                    if let Some(brush) = self.try_merge(&first, other)? {
                        merged = Some((j, brush));
                        break;
                    }
                }

                match merged {
                    Some((j, brush)) => {
                        pending.remove(j);
                        pending.push_back(brush);
                        merged_this_pass += 1;
                    }
                    None => kept.push(first),
                }
            }

            total += merged_this_pass;
            if merged_this_pass == 0 {
                break kept;
            }
            pending = kept.into();
        };

        if model == 0 {
            self.log.info(format_args!("{total} brushes merged"));
        }

        Ok(kept)
    }

    /// Merges two brushes if their union is a convex brush.
    ///
    /// The brushes must have the same contents, touch, share exactly one
    /// plane in opposite directions, and agree on the texture of every plane
    /// they both have a side on.
    pub(super) fn try_merge(&self, first: &Brush, second: &Brush) -> Result<Option<Brush>> {
        if first.contents != second.contents
            || !first.bounds.overlaps(&second.bounds, MERGE_BOUNDS_MARGIN)
        {
            return Ok(None);
        }

        let mut shared = 0;
        for side1 in &first.sides {
            if has_mirror(second, side1) {
                shared += 1;
                if shared > 1 {
                    return Ok(None);
                }
                continue;
            }

            for side2 in second.sides.iter().filter(|s| !has_mirror(first, s)) {
                if side1.plane == side2.plane {
                    if matches!((side1.texinfo, side2.texinfo), (Some(a), Some(b)) if a != b) {
                        return Ok(None);
                    }
                    continue;
                }

                if let (Some(w1), Some(w2)) = (&side1.winding, &side2.winding) {
                    let plane1 = self.registry.get(side1.plane);
                    let plane2 = self.registry.get(side2.plane);
                    if w1.are_non_convex(plane1, w2, plane2) {
                        return Ok(None);
                    }
                }
            }
        }
        if shared != 1 {
            return Ok(None);
        }

        // Co-planar sides lend each other their texture.
        let mut sides1 = first.sides.clone();
        let mut sides2 = second.sides.clone();
        for side1 in &mut sides1 {
            for side2 in sides2.iter_mut().filter(|s| s.plane == side1.plane) {
                side1.texinfo = side1.texinfo.or(side2.texinfo);
                side2.texinfo = side2.texinfo.or(side1.texinfo);
            }
        }

        let mut sides: Vec<Side> = Vec::with_capacity(sides1.len() + sides2.len());
        let first_sides = sides1.into_iter().filter(|s| !has_mirror(second, s));
        let second_sides = sides2.into_iter().filter(|s| {
            !first
                .sides
                .iter()
                .any(|f| f.plane == s.plane || f.plane == s.plane ^ 1)
        });
        for side in first_sides.chain(second_sides) {
            if sides.iter().any(|s| s.plane == side.plane) {
                self.log.info(format_args!("brush duplicate plane"));
                continue;
            }
            sides.push(side);
        }

        let mut merged = Brush::new(sides, first.contents);
        merged.create_windings(&self.registry, false)?;

        Ok(self.is_valid_merge(&merged).then_some(merged))
    }

    fn is_valid_merge(&self, brush: &Brush) -> bool {
        if brush.sides.len() < 3 {
            return false;
        }

        for (i, side1) in brush.sides.iter().enumerate() {
            for side2 in brush.sides.iter().skip(i + 1) {
                let (Some(w1), Some(w2)) = (&side1.winding, &side2.winding) else {
                    continue;
                };
                let plane1 = self.registry.get(side1.plane);
                let plane2 = self.registry.get(side2.plane);
                if w1.are_non_convex(plane1, w2, plane2) {
                    self.log.debug(format_args!("non convex brush"));
                    return false;
                }
            }
        }

        if !brush.bounds.within(BOGUS_RANGE) {
            self.log.info(format_args!(
                "brush: bounds out of range {:?} to {:?}",
                brush.bounds.mins.coords.as_slice(),
                brush.bounds.maxs.coords.as_slice()
            ));
            return false;
        }

        true
    }
}

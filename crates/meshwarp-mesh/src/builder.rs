//! Error-driven triangle subdivision.
//!
//! Every edge of the mesh ("segment") carries the squared distance between the
//! true projection of its source-space midpoint and the midpoint of its already
//! projected endpoints. Segments are bisected largest-error-first; bisecting a
//! segment splits every leaf triangle that shares it, so neighbouring triangles
//! stay conforming (no T-vertices).
//!
//! Triangles live in an arena and refer to each other by index. Split triangles
//! keep their two children, forming one tree per seed triangle; the leaves are
//! the output mesh.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};

use crate::error::MeshError;
use crate::output::{MeshOutput, MeshStats};
use crate::projector::{Projector, ProjectorAdapter};
use crate::quad::{ControlQuad, Point, SourceUv};

/// Default limit on how many times a seed triangle may be halved.
pub const DEFAULT_MAX_DEPTH: u32 = 20;

type VertexId = u32;
type TriangleId = usize;
type SegmentId = usize;

#[derive(Debug, Copy, Clone)]
struct Vertex {
    source: Point,
    projected: Point,
    uv: Point,
}

#[derive(Debug)]
struct TriangleNode {
    vertices: [VertexId; 3],
    depth: u32,
    children: Option<[TriangleId; 2]>,
}

/// True projection of a segment midpoint and its deviation from the chord.
#[derive(Debug, Copy, Clone)]
struct Sample {
    source: Point,
    projected: Point,
    error: f64,
}

#[derive(Debug)]
struct Segment {
    ends: [VertexId; 2],
    midpoint: Sample,
    /// Leaf triangles having this segment as an edge. Empty once bisected.
    leaves: Vec<TriangleId>,
}

#[derive(Debug, Copy, Clone)]
struct Candidate {
    error: f64,
    segment: SegmentId,
}

impl PartialEq for Candidate {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Candidate {}

impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Candidate {
    // Max-heap on error; ties go to the older segment so output is deterministic.
    fn cmp(&self, other: &Self) -> Ordering {
        self.error
            .total_cmp(&other.error)
            .then_with(|| other.segment.cmp(&self.segment))
    }
}

/// Incremental mesh refinement.
///
/// ```rust
/// use meshwarp_mesh::{ControlQuad, SourceUv, Subdivider, SEED_TRIANGLES};
///
/// let quad = ControlQuad::new([[0.0, 60.0], [0.0, 0.0], [30.0, 60.0], [30.0, 0.0]]).unwrap();
/// let bend = |p: [f64; 2]| [p[0], p[1] + p[0] * p[0] * 0.1];
///
/// let mut sub = Subdivider::new(&bend, &quad, &SourceUv::default(), &SEED_TRIANGLES).unwrap();
/// sub.lower_tolerance(1.0).unwrap();
/// let coarse = sub.output().triangle_count();
/// sub.lower_tolerance(0.01).unwrap();
/// assert!(sub.output().triangle_count() >= coarse);
/// ```
pub struct Subdivider<'p> {
    projector: ProjectorAdapter<'p>,
    max_depth: u32,
    tolerance: f64,

    vertices: Vec<Vertex>,
    triangles: Vec<TriangleNode>,
    roots: Vec<TriangleId>,

    segments: Vec<Segment>,
    by_ends: HashMap<[VertexId; 2], SegmentId>,
    queue: BinaryHeap<Candidate>,

    depth_limited: bool,
}

impl<'p> Subdivider<'p> {
    pub fn new(
        projector: &'p dyn Projector,
        quad: &ControlQuad,
        uv: &SourceUv,
        seeds: &[[u32; 3]],
    ) -> Result<Self, MeshError> {
        Self::with_max_depth(projector, quad, uv, seeds, DEFAULT_MAX_DEPTH)
    }

    /// Projects the control points and evaluates every seed edge.
    ///
    /// No refinement happens until [`lower_tolerance`](Self::lower_tolerance).
    pub fn with_max_depth(
        projector: &'p dyn Projector,
        quad: &ControlQuad,
        uv: &SourceUv,
        seeds: &[[u32; 3]],
        max_depth: u32,
    ) -> Result<Self, MeshError> {
        validate_seeds(seeds)?;

        let projector = ProjectorAdapter::new(projector);
        let vertices = quad
            .points()
            .iter()
            .zip(uv.coords())
            .map(|(&source, &uv)| {
                Ok(Vertex { source, projected: projector.project(source)?, uv })
            })
            .collect::<Result<Vec<_>, MeshError>>()?;

        let mut this = Self {
            projector,
            max_depth,
            tolerance: f64::INFINITY,
            vertices,
            triangles: Vec::new(),
            roots: Vec::new(),
            segments: Vec::new(),
            by_ends: HashMap::new(),
            queue: BinaryHeap::new(),
            depth_limited: false,
        };

        for &seed in seeds {
            let id = this.push_triangle(seed, 0);
            this.roots.push(id);

            for [a, b] in edges(seed) {
                let segment = match this.by_ends.get(&key(a, b)) {
                    Some(&s) => s,
                    None => {
                        let sample =
                            this.sample(&this.vertices[a as usize], &this.vertices[b as usize])?;
                        this.insert_segment(a, b, sample)
                    }
                };
                this.segments[segment].leaves.push(id);
            }
        }

        Ok(this)
    }

    /// The tolerance the mesh currently satisfies (`f64::INFINITY` before the first call).
    #[inline]
    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    /// Refines until no leaf edge has a squared midpoint error above `tolerance`.
    ///
    /// Refinement only ever adds triangles; a tolerance at or above the current one
    /// is a no-op. After an error the subdivider should be discarded.
    pub fn lower_tolerance(&mut self, tolerance: f64) -> Result<(), MeshError> {
        validate_tolerance(tolerance)?;
        if tolerance >= self.tolerance {
            return Ok(());
        }
        self.tolerance = tolerance;

        while let Some(&top) = self.queue.peek() {
            if top.error <= self.tolerance {
                break;
            }
            self.queue.pop();

            let too_deep = self.segments[top.segment]
                .leaves
                .iter()
                .any(|&t| self.triangles[t].depth >= self.max_depth);
            if too_deep {
                self.depth_limited = true;
                continue;
            }

            self.bisect(top.segment)?;
        }

        log::debug!(
            "subdivided to tolerance {}: {} vertices, {} segments",
            self.tolerance,
            self.vertices.len(),
            self.segments.len()
        );
        Ok(())
    }

    /// Flattens the leaf triangles.
    ///
    /// Vertices keep creation order (control points first). Triangles are listed
    /// depth-first, seeds in order, first child before second.
    pub fn output(&self) -> MeshOutput {
        let mut triangles = Vec::new();
        let mut stack: Vec<TriangleId> = self.roots.iter().rev().copied().collect();
        while let Some(t) = stack.pop() {
            match self.triangles[t].children {
                Some([first, second]) => {
                    stack.push(second);
                    stack.push(first);
                }
                None => triangles.push(self.triangles[t].vertices),
            }
        }

        let max_error = self
            .segments
            .iter()
            .filter(|s| !s.leaves.is_empty())
            .map(|s| s.midpoint.error)
            .fold(0.0, f64::max);

        MeshOutput {
            unprojected: self.vertices.iter().map(|v| v.source).collect(),
            projected: self.vertices.iter().map(|v| v.projected).collect(),
            uv: self.vertices.iter().map(|v| v.uv).collect(),
            stats: MeshStats {
                vertices: self.vertices.len(),
                triangles: triangles.len(),
                max_error,
                depth_limited: self.depth_limited,
            },
            triangles,
        }
    }

    // ── internals ─────────────────────────────────────────────────────────

    fn sample(&self, a: &Vertex, b: &Vertex) -> Result<Sample, MeshError> {
        let source = midpoint(a.source, b.source);
        let projected = self.projector.project(source)?;
        let chord = midpoint(a.projected, b.projected);
        let (dx, dy) = (projected[0] - chord[0], projected[1] - chord[1]);
        Ok(Sample { source, projected, error: dx * dx + dy * dy })
    }

    fn push_triangle(&mut self, vertices: [VertexId; 3], depth: u32) -> TriangleId {
        self.triangles.push(TriangleNode { vertices, depth, children: None });
        self.triangles.len() - 1
    }

    /// Returns the existing segment between `a` and `b`, or registers a new one.
    fn insert_segment(&mut self, a: VertexId, b: VertexId, midpoint: Sample) -> SegmentId {
        if let Some(&existing) = self.by_ends.get(&key(a, b)) {
            return existing;
        }
        let id = self.segments.len();
        self.segments.push(Segment { ends: key(a, b), midpoint, leaves: Vec::new() });
        self.by_ends.insert(key(a, b), id);
        self.queue.push(Candidate { error: midpoint.error, segment: id });
        id
    }

    fn replace_leaf(&mut self, a: VertexId, b: VertexId, old: TriangleId, new: TriangleId) {
        let Some(&segment) = self.by_ends.get(&key(a, b)) else { return };
        if let Some(slot) = self.segments[segment].leaves.iter_mut().find(|t| **t == old) {
            *slot = new;
        }
    }

    fn bisect(&mut self, segment: SegmentId) -> Result<(), MeshError> {
        let [a, b] = self.segments[segment].ends;
        let sample = self.segments[segment].midpoint;
        let mid = Vertex {
            source: sample.source,
            projected: sample.projected,
            uv: midpoint(self.vertices[a as usize].uv, self.vertices[b as usize].uv),
        };
        let m = self.vertices.len() as VertexId;

        // Sample every new edge up front so a projection failure leaves the mesh untouched.
        let leaves = self.segments[segment].leaves.clone();
        let corners: Vec<usize> = leaves
            .iter()
            .map(|&t| {
                edge_position(self.triangles[t].vertices, a, b)
                    .expect("segment leaves always contain the segment")
            })
            .collect();
        let half_a = self.sample(&self.vertices[a as usize], &mid)?;
        let half_b = self.sample(&mid, &self.vertices[b as usize])?;
        let spokes = leaves
            .iter()
            .zip(&corners)
            .map(|(&t, &i)| {
                let c = self.triangles[t].vertices[(i + 2) % 3];
                self.sample(&self.vertices[c as usize], &mid)
            })
            .collect::<Result<Vec<_>, MeshError>>()?;

        self.vertices.push(mid);
        self.segments[segment].leaves.clear();
        let seg_am = self.insert_segment(a, m, half_a);
        let seg_mb = self.insert_segment(m, b, half_b);

        for ((&parent, &i), spoke) in leaves.iter().zip(&corners).zip(spokes) {
            let verts = self.triangles[parent].vertices;
            let (p, q, c) = (verts[i], verts[(i + 1) % 3], verts[(i + 2) % 3]);

            // Both halves keep the parent's winding: (p, m, c) and (m, q, c).
            let mut first = verts;
            first[(i + 1) % 3] = m;
            let mut second = verts;
            second[i] = m;

            let depth = self.triangles[parent].depth + 1;
            let first_id = self.push_triangle(first, depth);
            let second_id = self.push_triangle(second, depth);
            self.triangles[parent].children = Some([first_id, second_id]);

            let seg_cm = self.insert_segment(c, m, spoke);
            self.segments[seg_cm].leaves.extend([first_id, second_id]);

            let (seg_pm, seg_mq) = if p == a { (seg_am, seg_mb) } else { (seg_mb, seg_am) };
            self.segments[seg_pm].leaves.push(first_id);
            self.segments[seg_mq].leaves.push(second_id);

            self.replace_leaf(c, p, parent, first_id);
            self.replace_leaf(q, c, parent, second_id);
        }

        Ok(())
    }
}

/// Builds a reprojection mesh in one call.
///
/// `tolerance` is the largest allowed *squared* distance, in projected units,
/// between a true edge midpoint and its linear approximation.
pub fn build(
    quad: &ControlQuad,
    uv: &SourceUv,
    seeds: &[[u32; 3]],
    projector: &dyn Projector,
    tolerance: f64,
) -> Result<MeshOutput, MeshError> {
    build_with_max_depth(quad, uv, seeds, projector, tolerance, DEFAULT_MAX_DEPTH)
}

/// Like [`build`] with an explicit depth safeguard.
pub fn build_with_max_depth(
    quad: &ControlQuad,
    uv: &SourceUv,
    seeds: &[[u32; 3]],
    projector: &dyn Projector,
    tolerance: f64,
    max_depth: u32,
) -> Result<MeshOutput, MeshError> {
    validate_tolerance(tolerance)?;

    let mut subdivider = Subdivider::with_max_depth(projector, quad, uv, seeds, max_depth)?;
    subdivider.lower_tolerance(tolerance)?;
    let mesh = subdivider.output();

    if mesh.stats.depth_limited {
        log::warn!(
            "mesh hit the depth limit ({max_depth}); largest remaining error {} exceeds tolerance {tolerance}",
            mesh.stats.max_error
        );
    }
    Ok(mesh)
}

fn validate_tolerance(tolerance: f64) -> Result<(), MeshError> {
    if tolerance.is_finite() && tolerance > 0.0 {
        Ok(())
    } else {
        Err(MeshError::config(format!(
            "error tolerance must be a positive finite number, got {tolerance}"
        )))
    }
}

fn validate_seeds(seeds: &[[u32; 3]]) -> Result<(), MeshError> {
    if seeds.is_empty() {
        return Err(MeshError::config("at least one seed triangle is required"));
    }
    for (n, &[a, b, c]) in seeds.iter().enumerate() {
        if a >= 4 || b >= 4 || c >= 4 {
            return Err(MeshError::config(format!(
                "seed triangle {n} references a vertex outside the control quad"
            )));
        }
        if a == b || b == c || a == c {
            return Err(MeshError::config(format!("seed triangle {n} is degenerate")));
        }
    }
    Ok(())
}

#[inline]
fn key(a: VertexId, b: VertexId) -> [VertexId; 2] {
    if a < b { [a, b] } else { [b, a] }
}

#[inline]
fn edges([a, b, c]: [VertexId; 3]) -> [[VertexId; 2]; 3] {
    [[a, b], [b, c], [c, a]]
}

/// Position `i` such that `verts[i]`, `verts[i + 1]` is the edge `{a, b}`.
fn edge_position(verts: [VertexId; 3], a: VertexId, b: VertexId) -> Option<usize> {
    (0..3).find(|&i| key(verts[i], verts[(i + 1) % 3]) == key(a, b))
}

#[inline]
fn midpoint(a: Point, b: Point) -> Point {
    [(a[0] + b[0]) * 0.5, (a[1] + b[1]) * 0.5]
}

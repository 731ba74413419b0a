//! Chunk plans for streaming coverage.
//!
//! Provides deterministic chunk plans plus seeded fuzz plans so chunked runs
//! are reproducible in CI. Every plan splits on UTF-8 character boundaries.

use std::fmt;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ChunkPlan {
    /// Chunks of `size` bytes, widened to the next character boundary.
    Fixed { size: usize },
    /// Split at the given byte offsets (normalized when applied).
    Boundaries { indices: Vec<usize> },
}

impl fmt::Display for ChunkPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChunkPlan::Fixed { size } => write!(f, "fixed size={size}"),
            ChunkPlan::Boundaries { indices } => {
                write!(f, "boundaries count={} indices={indices:?}", indices.len())
            }
        }
    }
}

impl ChunkPlan {
    pub fn fixed(size: usize) -> Self {
        Self::Fixed { size }
    }

    pub fn boundaries(indices: Vec<usize>) -> Self {
        Self::Boundaries { indices }
    }

    pub fn for_each_chunk(&self, input: &str, mut f: impl FnMut(&str)) {
        match self {
            ChunkPlan::Fixed { size } => {
                assert!(*size > 0, "chunk size must be > 0");
                let mut offset = 0usize;
                while offset < input.len() {
                    let mut end = (offset + size).min(input.len());
                    while !input.is_char_boundary(end) {
                        end += 1;
                    }
                    f(&input[offset..end]);
                    offset = end;
                }
            }
            ChunkPlan::Boundaries { indices } => {
                let mut points = indices.clone();
                points.retain(|&idx| idx > 0 && idx < input.len() && input.is_char_boundary(idx));
                points.sort_unstable();
                points.dedup();
                let mut last = 0usize;
                for idx in points {
                    f(&input[last..idx]);
                    last = idx;
                }
                if last < input.len() {
                    f(&input[last..]);
                }
            }
        }
    }
}

#[derive(Clone, Debug)]
pub struct ChunkPlanCase {
    pub label: String,
    pub plan: ChunkPlan,
}

/// Build deterministic + fuzz chunk plans for the given input.
///
/// - Deterministic includes fixed sizes and boundary-aware splits around
///   `<`, `</`, `>`, `=` and quotes.
/// - Fuzz plans are seeded for CI reproducibility.
pub fn build_chunk_plans(input: &str, fuzz_runs: usize, fuzz_seed: u64) -> Vec<ChunkPlanCase> {
    let mut plans = Vec::new();

    for size in [1usize, 2, 3, 4, 8, 16, 32, 64] {
        plans.push(ChunkPlanCase {
            label: format!("fixed size={size}"),
            plan: ChunkPlan::fixed(size),
        });
    }

    let token_boundaries = token_boundary_indices(input);
    if !token_boundaries.is_empty() {
        plans.push(ChunkPlanCase {
            label: format!("token-boundaries count={}", token_boundaries.len()),
            plan: ChunkPlan::boundaries(token_boundaries.clone()),
        });
    }

    let mut candidates = char_boundaries(input);
    candidates.extend(token_boundaries);
    candidates.sort_unstable();
    candidates.dedup();
    for i in 0..fuzz_runs {
        let seed = fuzz_seed.wrapping_add(i as u64);
        let mut rng = Lcg::new(seed);
        let plan = if candidates.is_empty() {
            // Fallback for empty/1-char inputs.
            ChunkPlan::fixed(1)
        } else {
            let max = candidates.len().clamp(1, 32);
            let mut picks = candidates.clone();
            rng.shuffle(&mut picks);
            picks.truncate(1 + rng.gen_range(max));
            picks.sort_unstable();
            ChunkPlan::boundaries(picks)
        };
        plans.push(ChunkPlanCase {
            label: format!("fuzz boundaries seed=0x{seed:016x}"),
            plan,
        });
    }

    plans
}

/// Greedily drop split points while `still_fails` holds, returning the
/// smallest failing boundary plan found.
pub fn shrink_chunk_plan(
    input: &str,
    plan: &ChunkPlan,
    mut still_fails: impl FnMut(&ChunkPlan) -> bool,
) -> ChunkPlan {
    let mut indices = Vec::new();
    let mut offset = 0usize;
    plan.for_each_chunk(input, |chunk| {
        offset += chunk.len();
        if offset < input.len() {
            indices.push(offset);
        }
    });
    let mut i = 0usize;
    while i < indices.len() {
        let mut candidate = indices.clone();
        candidate.remove(i);
        if still_fails(&ChunkPlan::boundaries(candidate.clone())) {
            indices = candidate;
        } else {
            i += 1;
        }
    }
    ChunkPlan::boundaries(indices)
}

fn token_boundary_indices(input: &str) -> Vec<usize> {
    let bytes = input.as_bytes();
    let mut out = Vec::new();
    for (i, &b) in bytes.iter().enumerate() {
        if matches!(b, b'<' | b'>' | b'"' | b'\'' | b'=' | b'/') {
            out.push(i);
            if i + 1 < bytes.len() {
                out.push(i + 1);
            }
        }
    }
    out.retain(|&idx| idx > 0 && input.is_char_boundary(idx));
    out.sort_unstable();
    out.dedup();
    out
}

fn char_boundaries(input: &str) -> Vec<usize> {
    input
        .char_indices()
        .map(|(idx, _)| idx)
        .filter(|&idx| idx != 0)
        .collect()
}

struct Lcg {
    state: u64,
}

impl Lcg {
    fn new(seed: u64) -> Self {
        Self { state: seed }
    }

    fn next_u64(&mut self) -> u64 {
        self.state = self.state.wrapping_mul(6364136223846793005).wrapping_add(1);
        self.state
    }

    fn gen_range(&mut self, upper: usize) -> usize {
        if upper == 0 {
            return 0;
        }
        (self.next_u64() >> 32) as usize % upper
    }

    fn shuffle<T>(&mut self, items: &mut [T]) {
        for i in (1..items.len()).rev() {
            let j = self.gen_range(i + 1);
            items.swap(i, j);
        }
    }
}

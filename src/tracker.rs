//! Coarse-to-fine whole-marker search.
//!
//! Each marker is searched independently: a grid scan at a coarse step,
//! then repeated halving of the step inside a shrinking window around the
//! best location so far, ending with a pass at step 1. The search is local
//! and can settle in a local minimum, mostly when no prior narrows the
//! first window.

use std::borrow::Borrow;

use glam::IVec2;
use image::Rgb32FImage;
use log::{debug, trace, warn};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{AlignError, Result};
use crate::ssd::{OUT_OF_BOUNDS_PENALTY, marker_ssd};
use crate::types::Point;

pub const MARKER_COUNT: usize = 4;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// The first step is the marker size divided by this.
    pub coarse_divisor: u32,
    /// Half-width of the first window around a known previous location, as
    /// a fraction of the frame size.
    pub prior_reach: f64,
    /// Search each marker on its own thread.
    pub parallel: bool,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            coarse_divisor: 8,
            prior_reach: 0.1,
            parallel: true,
        }
    }
}

/// Half-open search window in frame pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Window {
    min: IVec2,
    max: IVec2,
}

impl Window {
    fn clipped(min: IVec2, max: IVec2, width: u32, height: u32) -> Window {
        let bound = IVec2::new(width as i32, height as i32);
        Window {
            min: min.clamp(IVec2::ZERO, bound),
            max: max.clamp(IVec2::ZERO, bound),
        }
    }
}

/// Locates one marker in `frame`. Returns the best location and its ssd,
/// or `None` when no window position was evaluated.
pub fn locate_marker(
    frame: &Rgb32FImage,
    marker: &Rgb32FImage,
    previous: Option<IVec2>,
    config: &TrackerConfig,
) -> Option<(IVec2, f32)> {
    let (width, height) = frame.dimensions();
    let divisor = config.coarse_divisor.max(1);
    let mut step = IVec2::new(
        (marker.width() / divisor).max(1) as i32,
        (marker.height() / divisor).max(1) as i32,
    );

    let mut window = match previous {
        Some(p) => {
            let reach = IVec2::new(
                (width as f64 * config.prior_reach) as i32,
                (height as f64 * config.prior_reach) as i32,
            );
            Window::clipped(p - reach, p + reach, width, height)
        }
        None => Window::clipped(IVec2::ZERO, IVec2::new(width as i32, height as i32), width, height),
    };

    let mut best_ssd = (marker.width() * marker.height()) as f32 * OUT_OF_BOUNDS_PENALTY;
    let mut best: Option<IVec2> = None;
    loop {
        trace!("step {:?} window {:?}", step, window);
        for x in (window.min.x..window.max.x).step_by(step.x as usize) {
            for y in (window.min.y..window.max.y).step_by(step.y as usize) {
                let ssd = marker_ssd(frame, x, y, marker);
                if ssd < best_ssd {
                    best_ssd = ssd;
                    best = Some(IVec2::new(x, y));
                }
            }
        }
        let center = best?;
        if step == IVec2::ONE {
            break;
        }
        step = (step / 2).max(IVec2::ONE);
        let reach = step * 2;
        window = Window::clipped(center - reach, center + reach, width, height);
    }
    best.map(|p| (p, best_ssd))
}

/// Locates every marker in `frame`, one search per marker. With
/// `config.parallel` the searches run on a pool with one thread per marker;
/// each writes only its own result slot.
pub fn locate_markers<M: Borrow<Rgb32FImage> + Sync>(
    frame: &Rgb32FImage,
    markers: &[M],
    previous: &[Option<IVec2>],
    config: &TrackerConfig,
) -> Result<Vec<IVec2>> {
    let pool = if config.parallel && markers.len() > 1 {
        Some(marker_pool(markers.len())?)
    } else {
        None
    };
    locate_markers_in(pool.as_ref(), frame, markers, previous, config)
}

/// Pool with one thread per marker.
pub fn marker_pool(markers: usize) -> Result<rayon::ThreadPool> {
    Ok(rayon::ThreadPoolBuilder::new().num_threads(markers.max(1)).build()?)
}

/// Like [`locate_markers`], searching on `pool` when one is given and
/// serially otherwise.
pub fn locate_markers_in<M: Borrow<Rgb32FImage> + Sync>(
    pool: Option<&rayon::ThreadPool>,
    frame: &Rgb32FImage,
    markers: &[M],
    previous: &[Option<IVec2>],
    config: &TrackerConfig,
) -> Result<Vec<IVec2>> {
    if markers.len() != previous.len() {
        return Err(AlignError::InvalidInput(format!(
            "{} markers but {} previous locations",
            markers.len(),
            previous.len()
        )));
    }
    let search = |(marker, prior): (&M, &Option<IVec2>)| {
        locate_marker(frame, <M as Borrow<Rgb32FImage>>::borrow(marker), *prior, config)
    };
    let slots: Vec<Option<(IVec2, f32)>> = match pool {
        Some(pool) => {
            pool.install(|| markers.par_iter().zip(previous.par_iter()).map(search).collect())
        }
        None => markers.iter().zip(previous.iter()).map(search).collect(),
    };

    slots
        .into_iter()
        .enumerate()
        .map(|(index, slot)| match slot {
            Some((p, ssd)) => {
                debug!("marker {} at ({}, {}) ssd {:.3}", index, p.x, p.y, ssd);
                Ok(p)
            }
            None => {
                warn!("marker {} not located", index);
                Err(AlignError::MarkerNotFound { index })
            }
        })
        .collect()
}

/// One tracked marker: its reference image and last known location.
#[derive(Debug, Clone)]
pub struct MarkerTrack {
    pub index: usize,
    pub reference: Rgb32FImage,
    pub location: Option<IVec2>,
}

/// Tracks the four markers of a planar target across frames, seeding each
/// frame's search with the previous frame's locations. The search pool is
/// built once and reused for every frame.
pub struct MarkerTracker {
    pub tracks: Vec<MarkerTrack>,
    pub config: TrackerConfig,
    pool: Option<rayon::ThreadPool>,
}

impl MarkerTracker {
    /// Markers are ordered bottom-left, bottom-right, top-left, top-right.
    pub fn new(markers: Vec<Rgb32FImage>, config: TrackerConfig) -> Result<MarkerTracker> {
        if markers.len() != MARKER_COUNT {
            return Err(AlignError::MarkerCount {
                expected: MARKER_COUNT,
                got: markers.len(),
            });
        }
        let tracks = markers
            .into_iter()
            .enumerate()
            .map(|(index, reference)| MarkerTrack {
                index,
                reference,
                location: None,
            })
            .collect();
        let pool = if config.parallel {
            Some(marker_pool(MARKER_COUNT)?)
        } else {
            None
        };
        Ok(MarkerTracker {
            tracks,
            config,
            pool,
        })
    }

    pub fn locations(&self) -> Vec<Option<IVec2>> {
        self.tracks.iter().map(|t| t.location).collect()
    }

    /// Locates all markers in `frame` and stores them as the next prior.
    /// On failure the stored locations are left as they were.
    pub fn track(&mut self, frame: &Rgb32FImage) -> Result<Vec<IVec2>> {
        let references: Vec<&Rgb32FImage> = self.tracks.iter().map(|t| &t.reference).collect();
        let pool = self.pool.as_ref().filter(|_| self.config.parallel);
        let found = locate_markers_in(pool, frame, &references, &self.locations(), &self.config)?;
        for (track, p) in self.tracks.iter_mut().zip(found.iter()) {
            track.location = Some(*p);
        }
        Ok(found)
    }

    pub fn is_parallel(&self) -> bool {
        self.config.parallel && self.pool.is_some()
    }

    pub fn reset(&mut self) {
        for track in &mut self.tracks {
            track.location = None;
        }
    }
}

pub fn to_points(locations: &[IVec2]) -> Vec<Point> {
    locations.iter().map(|p| p.as_dvec2()).collect()
}

//! Bounded tile queues between bulk memory and local memory.
//!
//! A [`TileQueue`] is a fixed arena of tile slots. While a stream runs, the
//! free slots travel through a bounded channel: acquiring a slot is a blocking
//! receive, releasing it is a send. A slot is therefore never reused before
//! the stage that holds it has finished with it, and at most `depth` tiles of
//! one queue are in flight at once.
//!
//! [`TileStager::stream`] runs three stages per unit:
//!
//! ```text
//! stage-in thread --(in queue)--> compute (caller) --(out queue)--> stage-out thread
//! ```
//!
//! so that tile k+1 is copied in and tile k-1 copied out while tile k is
//! computed.

use std::thread::{self, Scope, ScopedJoinHandle};

use crossbeam_channel::bounded;
use tp_tensor::{LocalTile, Pipe};

use crate::error::{KernelError, Result};

/// A fixed set of equally sized tile slots.
#[derive(Debug)]
pub struct TileQueue {
    depth: usize,
    tile_len: usize,
    slots: Vec<LocalTile>,
}

impl TileQueue {
    /// Carve `depth` slots of `tile_len` elements out of the pipe.
    pub fn new(pipe: &mut Pipe, depth: usize, tile_len: usize) -> Result<Self> {
        if depth == 0 {
            return Err(KernelError::ZeroDepth);
        }
        let slots = pipe.init_tiles(depth, tile_len)?;
        Ok(TileQueue {
            depth,
            tile_len,
            slots,
        })
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn tile_len(&self) -> usize {
        self.tile_len
    }

    /// Slots currently parked in the arena. Equals `depth` between streams.
    pub fn idle(&self) -> usize {
        self.slots.len()
    }

    /// Run `produce` on the calling thread against free slots of this queue
    /// and hand every filled tile to `write` on a stage-out thread.
    ///
    /// `produce` returns the destination of the tile it just filled, or
    /// `None` once it has nothing left. Returns the number of tiles written.
    pub fn emit<D, P, W>(&mut self, produce: P, write: W) -> Result<usize>
    where
        D: Send,
        P: FnMut(&mut LocalTile) -> Result<Option<D>>,
        W: FnMut(&LocalTile, D) + Send,
    {
        thread::scope(|s| drive_out(self, s, produce, write))
    }
}

/// One tile-sized transfer: where a tile is staged in from and where its
/// result is staged out to.
#[derive(Debug)]
pub enum Span<'a> {
    /// Read from `src`, write the result to `dst`.
    Copy { src: &'a [f32], dst: &'a mut [f32] },
    /// Read from and write back to the same bulk range.
    InPlace(&'a mut [f32]),
}

impl<'a> Span<'a> {
    fn source(&self) -> &[f32] {
        match self {
            Span::Copy { src, .. } => src,
            Span::InPlace(dst) => dst,
        }
    }

    fn into_dest(self) -> &'a mut [f32] {
        match self {
            Span::Copy { dst, .. } => dst,
            Span::InPlace(dst) => dst,
        }
    }
}

/// Bulk to local copy. The tile is complete when this returns.
pub fn stage_in(tile: &mut LocalTile, src: &[f32]) {
    tile.load(src);
}

/// Local to bulk copy. The tile may be recycled when this returns.
pub fn stage_out(tile: &LocalTile, dst: &mut [f32]) {
    tile.store(dst);
}

/// Paired input and output queues of one unit.
#[derive(Debug)]
pub struct TileStager {
    in_queue: TileQueue,
    out_queue: TileQueue,
}

impl TileStager {
    pub fn new(pipe: &mut Pipe, depth: usize, tile_len: usize) -> Result<Self> {
        Ok(TileStager {
            in_queue: TileQueue::new(pipe, depth, tile_len)?,
            out_queue: TileQueue::new(pipe, depth, tile_len)?,
        })
    }

    pub fn depth(&self) -> usize {
        self.in_queue.depth()
    }

    /// Stream every span through `compute(input, output)` in order.
    ///
    /// Each span's source is staged into an input tile, `compute` fills a
    /// fresh output tile from it, and the output tile is staged out to the
    /// span's destination. Spans are processed strictly in iteration order,
    /// so the result does not depend on the queue depth.
    pub fn stream<'a, I, F>(&mut self, spans: I, mut compute: F) -> Result<()>
    where
        I: IntoIterator<Item = Span<'a>>,
        I::IntoIter: Send,
        F: FnMut(&LocalTile, &mut LocalTile) -> Result<()>,
    {
        let in_queue = &mut self.in_queue;
        let out_queue = &mut self.out_queue;

        let (free_tx, free_rx) = bounded::<LocalTile>(in_queue.depth);
        for tile in in_queue.slots.drain(..) {
            free_tx
                .send(tile)
                .map_err(|_| KernelError::PipelineClosed("in queue"))?;
        }
        let reclaim = free_rx.clone();
        let (ready_tx, ready_rx) = bounded::<(LocalTile, Span<'a>)>(in_queue.depth);
        let spans = spans.into_iter();

        thread::scope(|s| {
            let staged = ready_rx.clone();
            let copy_in = s.spawn(move || -> Result<()> {
                for span in spans {
                    let mut tile = free_rx
                        .recv()
                        .map_err(|_| KernelError::PipelineClosed("stage-in"))?;
                    stage_in(&mut tile, span.source());
                    ready_tx
                        .send((tile, span))
                        .map_err(|_| KernelError::PipelineClosed("stage-in"))?;
                }
                Ok(())
            });

            let computed = drive_out(
                out_queue,
                s,
                move |out: &mut LocalTile| {
                    let Ok((input, span)) = ready_rx.recv() else {
                        return Ok(None);
                    };
                    let computed = compute(&input, out);
                    free_tx
                        .send(input)
                        .map_err(|_| KernelError::PipelineClosed("in queue"))?;
                    computed?;
                    Ok(Some(span.into_dest()))
                },
                |tile: &LocalTile, dst: &mut [f32]| stage_out(tile, dst),
            );

            // Tiles staged in but never computed. The stage-in thread owns
            // the only sender, so this ends once it has stopped.
            let unused: Vec<LocalTile> = staged.iter().map(|(tile, _)| tile).collect();
            let fed = join(copy_in);
            in_queue.slots.extend(reclaim.try_iter());
            in_queue.slots.extend(unused);
            computed.and(fed)
        })
    }
}

/// Shared stage-out half of a stream: `produce` runs here, `write` runs on a
/// scoped stage-out thread, and the queue's slots circulate between them.
fn drive_out<'scope, 'env, D, P, W>(
    queue: &mut TileQueue,
    scope: &'scope Scope<'scope, 'env>,
    mut produce: P,
    mut write: W,
) -> Result<usize>
where
    D: Send + 'scope,
    P: FnMut(&mut LocalTile) -> Result<Option<D>>,
    W: FnMut(&LocalTile, D) + Send + 'scope,
{
    let (free_tx, free_rx) = bounded::<LocalTile>(queue.depth);
    for tile in queue.slots.drain(..) {
        free_tx
            .send(tile)
            .map_err(|_| KernelError::PipelineClosed("out queue"))?;
    }
    let reclaim = free_rx.clone();
    let (ready_tx, ready_rx) = bounded::<(LocalTile, D)>(queue.depth);

    let copy_out = scope.spawn(move || {
        for (tile, dest) in ready_rx {
            write(&tile, dest);
            if free_tx.send(tile).is_err() {
                break;
            }
        }
    });

    let mut produced = 0usize;
    let result = loop {
        let mut tile = match free_rx.recv() {
            Ok(tile) => tile,
            Err(_) => break Err(KernelError::PipelineClosed("stage-out")),
        };
        match produce(&mut tile) {
            Ok(Some(dest)) => {
                if ready_tx.send((tile, dest)).is_err() {
                    break Err(KernelError::PipelineClosed("stage-out"));
                }
                produced += 1;
            }
            Ok(None) => {
                queue.slots.push(tile);
                break Ok(produced);
            }
            Err(e) => {
                queue.slots.push(tile);
                break Err(e);
            }
        }
    };

    drop(ready_tx);
    drop(free_rx);
    join(copy_out);
    queue.slots.extend(reclaim.try_iter());
    result
}

/// Join a stage thread, re-raising its panic on the caller.
fn join<T>(handle: ScopedJoinHandle<'_, T>) -> T {
    match handle.join() {
        Ok(v) => v,
        Err(payload) => std::panic::resume_unwind(payload),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn stager(depth: usize, tile_len: usize) -> TileStager {
        TileStager::new(&mut Pipe::default(), depth, tile_len).unwrap()
    }

    #[test]
    fn test_stream_copy_spans() {
        let mut st = stager(2, 4);
        let src: Vec<f32> = (0..32).map(|v| v as f32).collect();
        let mut dst = vec![0.0f32; 32];
        let spans = src
            .chunks_exact(4)
            .zip(dst.chunks_exact_mut(4))
            .map(|(src, dst)| Span::Copy { src, dst });
        st.stream(spans, |x, z| {
            for (o, i) in z.iter_mut().zip(x.iter()) {
                *o = i * 2.0;
            }
            Ok(())
        })
        .unwrap();
        let expected: Vec<f32> = src.iter().map(|v| v * 2.0).collect();
        assert_eq!(dst, expected);
        assert_eq!(st.in_queue.idle(), 2);
        assert_eq!(st.out_queue.idle(), 2);
    }

    #[test]
    fn test_stream_in_place() {
        let mut st = stager(2, 3);
        let mut buf: Vec<f32> = (0..9).map(|v| v as f32).collect();
        st.stream(buf.chunks_exact_mut(3).map(Span::InPlace), |x, z| {
            for (o, i) in z.iter_mut().zip(x.iter()) {
                *o = i + 100.0;
            }
            Ok(())
        })
        .unwrap();
        assert_eq!(buf[0], 100.0);
        assert_eq!(buf[8], 108.0);
    }

    #[test]
    fn test_compute_sees_tiles_in_order() {
        let mut st = stager(2, 2);
        let src: Vec<f32> = (0..20).map(|v| v as f32).collect();
        let mut dst = vec![0.0f32; 20];
        let mut seen = Vec::new();
        let spans = src
            .chunks_exact(2)
            .zip(dst.chunks_exact_mut(2))
            .map(|(src, dst)| Span::Copy { src, dst });
        st.stream(spans, |x, z| {
            seen.push(x[0]);
            z.copy_from_slice(x);
            Ok(())
        })
        .unwrap();
        let expected: Vec<f32> = (0..10).map(|t| (t * 2) as f32).collect();
        assert_eq!(seen, expected);
        assert_eq!(dst, src);
    }

    #[test]
    fn test_compute_error_stops_stream() {
        let mut st = stager(2, 2);
        let src = vec![1.0f32; 16];
        let mut dst = vec![0.0f32; 16];
        let spans = src
            .chunks_exact(2)
            .zip(dst.chunks_exact_mut(2))
            .map(|(src, dst)| Span::Copy { src, dst });
        let mut calls = 0;
        let err = st
            .stream(spans, |_, _| {
                calls += 1;
                if calls == 3 {
                    return Err(KernelError::Other("boom".to_string()));
                }
                Ok(())
            })
            .unwrap_err();
        assert!(matches!(err, KernelError::Other(_)));
        assert_eq!(calls, 3);
        assert_eq!(st.in_queue.idle(), 2);
        assert_eq!(st.out_queue.idle(), 2);

        // every slot is back, so the stager is usable again
        let spans = src
            .chunks_exact(2)
            .zip(dst.chunks_exact_mut(2))
            .map(|(src, dst)| Span::Copy { src, dst });
        st.stream(spans, |x, z| {
            z.copy_from_slice(x);
            Ok(())
        })
        .unwrap();
        assert_eq!(dst, src);
    }

    #[test]
    fn test_stream_bounds_input_tiles_in_flight() {
        let mut st = stager(2, 4);
        let src: Vec<f32> = (0..64).map(|v| v as f32).collect();
        let mut dst = vec![0.0f32; 64];
        let pulled = AtomicUsize::new(0);
        let mut done = 0usize;
        let mut max_seen = 0usize;

        let spans = src
            .chunks_exact(4)
            .zip(dst.chunks_exact_mut(4))
            .map(|(src, dst)| Span::Copy { src, dst })
            .inspect(|_| {
                pulled.fetch_add(1, Ordering::SeqCst);
            });
        st.stream(spans, |x, z| {
            std::thread::sleep(std::time::Duration::from_millis(1));
            // Spans pulled but not yet released: the tiles holding data plus
            // at most one span waiting for a free slot.
            max_seen = max_seen.max(pulled.load(Ordering::SeqCst) - done);
            z.copy_from_slice(x);
            done += 1;
            Ok(())
        })
        .unwrap();

        assert!(max_seen <= 2 + 1, "{max_seen} spans in flight");
        assert_eq!(st.in_queue.idle(), 2);
        assert_eq!(dst, src);
    }

    #[test]
    fn test_zero_depth_rejected() {
        let err = TileQueue::new(&mut Pipe::default(), 0, 4).unwrap_err();
        assert!(matches!(err, KernelError::ZeroDepth));
    }

    #[test]
    fn test_emit_bounds_tiles_in_flight() {
        let mut pipe = Pipe::default();
        let mut q = TileQueue::new(&mut pipe, 1, 4).unwrap();
        let in_flight = Arc::new(AtomicUsize::new(0));
        let max_seen = Arc::new(AtomicUsize::new(0));
        let mut next = 0usize;
        let mut out = vec![0.0f32; 40];

        let produced = {
            let in_flight_p = Arc::clone(&in_flight);
            let max_seen_p = Arc::clone(&max_seen);
            let in_flight_w = Arc::clone(&in_flight);
            let out_ref = &mut out;
            q.emit(
                move |tile| {
                    if next == 10 {
                        return Ok(None);
                    }
                    tile.fill(next as f32);
                    let now = in_flight_p.fetch_add(1, Ordering::SeqCst) + 1;
                    max_seen_p.fetch_max(now, Ordering::SeqCst);
                    next += 1;
                    Ok(Some(next - 1))
                },
                move |tile, idx| {
                    out_ref[idx * 4..idx * 4 + 4].copy_from_slice(tile);
                    in_flight_w.fetch_sub(1, Ordering::SeqCst);
                },
            )
            .unwrap()
        };

        assert_eq!(produced, 10);
        assert_eq!(max_seen.load(Ordering::SeqCst), 1);
        assert_eq!(q.idle(), 1);
        for idx in 0..10 {
            assert!(out[idx * 4..idx * 4 + 4].iter().all(|&v| v == idx as f32));
        }
    }

    #[test]
    #[should_panic(expected = "range end index")]
    fn test_stage_out_fault_propagates() {
        let mut q = TileQueue::new(&mut Pipe::default(), 2, 4).unwrap();
        let mut out = vec![0.0f32; 4];
        let mut first = true;
        let _ = q.emit(
            |_tile| {
                if first {
                    first = false;
                    Ok(Some(8usize))
                } else {
                    Ok(None)
                }
            },
            |tile, offset| stage_out(tile, &mut out[offset..offset + 4]),
        );
    }
}

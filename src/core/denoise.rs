//! Denoise stage.

use crate::core::event::Event;
use crate::core::geometry::Vector2u;
use crate::core::image_io::Image;
use crate::core::pbrt::Float;
use crate::core::workq;
use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::{Arc, Mutex};

/// A denoise stage over the color image guided by the normal and albedo
/// planes. Scheduling chains an event onto all three inputs so the filter
/// only runs once they are complete.
///
/// This build carries no external denoising library, so the filter is a
/// passthrough of the color plane; the scheduling structure is the same
/// either way.
pub struct DenoiseImage {
    color: Image,
    normals: Image,
    albedo: Image,

    buffer: Mutex<Vec<Float>>,
    event: Mutex<Option<Arc<Event>>>,
    scheduled: AtomicI32,
}

/// Chains a denoise stage onto a rendered image.
pub fn denoise(color: Image, normals: Image, albedo: Image) -> Image {
    Image::Denoise {
        stage: Arc::new(DenoiseImage {
            color,
            normals,
            albedo,
            buffer: Mutex::new(Vec::new()),
            event: Mutex::new(None),
            scheduled: AtomicI32::new(0),
        }),
    }
}

impl DenoiseImage {
    pub fn size(&self) -> Vector2u {
        self.color.size()
    }

    pub fn pixels(&self) -> Vec<Float> {
        // Only called through `Image::pixels`, which has scheduled and
        // waited already; the buffer is final here.
        self.buffer.lock().unwrap().clone()
    }

    /// Schedules the inputs, then registers the filter to run on the work
    /// queue once all of them have completed. One-shot, like the render
    /// context's scheduler.
    pub fn schedule(stage: &Arc<DenoiseImage>) -> Arc<Event> {
        loop {
            match stage
                .scheduled
                .compare_exchange(0, -1, Ordering::AcqRel, Ordering::Acquire)
            {
                Ok(_) => {
                    let inputs = vec![
                        stage.color.schedule(),
                        stage.normals.schedule(),
                        stage.albedo.schedule(),
                    ];
                    let ready = Event::when_all(&inputs);

                    let run_stage = Arc::clone(stage);
                    let event = ready.notify(Some(workq::get_queue()), move || {
                        run_stage.run();
                    });

                    *stage.event.lock().unwrap() = Some(Arc::clone(&event));
                    stage.scheduled.store(1, Ordering::Release);
                    return event;
                }
                Err(1) => {
                    if let Some(e) = stage.event.lock().unwrap().clone() {
                        return e;
                    }
                }
                Err(_) => std::hint::spin_loop(),
            }
        }
    }

    fn run(&self) {
        warn!("Built without a denoising backend, passing the image through");
        *self.buffer.lock().unwrap() = self.color.pixels();
    }
}

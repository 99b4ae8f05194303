//! Detailed cloud model: background glTF load and puff templates.
//!
//! The loader runs on its own thread and publishes exactly one [`ModelEvent`]
//! over a channel. The cluster field polls it at the start of a frame, so a
//! swap never lands halfway through an update pass. If the field is dropped
//! first, the shared liveness flag is cleared and the result is discarded.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, TryRecvError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use anyhow::Context;
use glam::{Mat4, Vec3};

use crate::cluster::{Puff, PuffLayer};
use crate::error::SkyError;

/// Largest dimension of a loaded model after normalisation, in world units.
pub const MODEL_TARGET_SIZE: f32 = 80.0;
/// Per-cluster random scale applied to the model copy.
pub const MODEL_SCALE_RANGE: (f32, f32) = (0.6, 1.4);

/// One puff of a loaded model, already normalised to [`MODEL_TARGET_SIZE`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PuffTemplate {
    pub offset: Vec3,
    pub radius: f32,
}

/// A loaded model reduced to puff templates (one per mesh primitive).
#[derive(Debug, Clone)]
pub struct CloudModel {
    templates: Vec<PuffTemplate>,
}

impl CloudModel {
    /// Build from axis-aligned boxes in model space, scaling the whole set so
    /// its largest dimension is [`MODEL_TARGET_SIZE`].
    pub fn from_bounds(boxes: &[(Vec3, Vec3)]) -> anyhow::Result<Self> {
        anyhow::ensure!(!boxes.is_empty(), "model contains no mesh primitives");
        let mut lo = Vec3::splat(f32::INFINITY);
        let mut hi = Vec3::splat(f32::NEG_INFINITY);
        for (min, max) in boxes {
            lo = lo.min(*min);
            hi = hi.max(*max);
        }
        anyhow::ensure!(lo.is_finite() && hi.is_finite(), "model bounds are not finite");

        let max_dim = (hi - lo).max_element();
        let factor = MODEL_TARGET_SIZE / if max_dim > 0.0 { max_dim } else { 1.0 };
        let templates = boxes
            .iter()
            .map(|(min, max)| PuffTemplate {
                offset: (*min + *max) * 0.5 * factor,
                radius: ((*max - *min) * 0.5).max_element().max(f32::EPSILON) * factor,
            })
            .collect();
        Ok(Self { templates })
    }

    /// Read a glTF/GLB file and turn every primitive's bounds (in scene space)
    /// into a template.
    pub fn load_gltf(path: &Path) -> anyhow::Result<Self> {
        let (document, _buffers, _images) =
            gltf::import(path).with_context(|| format!("failed to import {}", path.display()))?;

        let mut boxes = Vec::new();
        match document.default_scene().or_else(|| document.scenes().next()) {
            Some(scene) => {
                for node in scene.nodes() {
                    collect_node_bounds(&node, Mat4::IDENTITY, &mut boxes);
                }
            }
            None => {
                for mesh in document.meshes() {
                    for primitive in mesh.primitives() {
                        let b = primitive.bounding_box();
                        boxes.push((Vec3::from(b.min), Vec3::from(b.max)));
                    }
                }
            }
        }
        Self::from_bounds(&boxes).with_context(|| format!("unusable cloud model {}", path.display()))
    }

    pub fn templates(&self) -> &[PuffTemplate] {
        &self.templates
    }

    /// Copy of the model as puffs, scaled by `scale`.
    pub fn instantiate(&self, scale: f32, sun_color: Vec3, emissive_intensity: f32) -> Vec<Puff> {
        self.templates
            .iter()
            .map(|t| Puff {
                offset: t.offset * scale,
                rotation: Vec3::ZERO,
                radius: t.radius * scale,
                scale: 1.0,
                layer: PuffLayer::Model,
                opacity: 0.0,
                emissive: sun_color,
                emissive_intensity,
            })
            .collect()
    }
}

fn collect_node_bounds(node: &gltf::Node, parent: Mat4, out: &mut Vec<(Vec3, Vec3)>) {
    let world = parent * Mat4::from_cols_array_2d(&node.transform().matrix());
    if let Some(mesh) = node.mesh() {
        for primitive in mesh.primitives() {
            let b = primitive.bounding_box();
            out.push(transform_aabb(world, Vec3::from(b.min), Vec3::from(b.max)));
        }
    }
    for child in node.children() {
        collect_node_bounds(&child, world, out);
    }
}

/// Bounds of the eight transformed corners.
fn transform_aabb(m: Mat4, min: Vec3, max: Vec3) -> (Vec3, Vec3) {
    let mut lo = Vec3::splat(f32::INFINITY);
    let mut hi = Vec3::splat(f32::NEG_INFINITY);
    for i in 0..8 {
        let corner = Vec3::new(
            if i & 1 == 0 { min.x } else { max.x },
            if i & 2 == 0 { min.y } else { max.y },
            if i & 4 == 0 { min.z } else { max.z },
        );
        let p = m.transform_point3(corner);
        lo = lo.min(p);
        hi = hi.max(p);
    }
    (lo, hi)
}

/// Outcome of a background load. Failure is terminal for the swap, never for the sky.
#[derive(Debug)]
pub enum ModelEvent {
    Ready(CloudModel),
    Failed(SkyError),
}

/// Handle to one in-flight background model load.
pub struct ModelLoader {
    rx: Receiver<ModelEvent>,
    thread: Option<JoinHandle<()>>,
}

impl ModelLoader {
    /// Run `load` on a background thread. The result is published only while
    /// `alive` is still set.
    pub fn spawn<F>(alive: Arc<AtomicBool>, load: F) -> Self
    where
        F: FnOnce() -> anyhow::Result<CloudModel> + Send + 'static,
    {
        let (tx, rx) = mpsc::channel::<ModelEvent>();
        let worker_tx = tx.clone();
        let spawned = thread::Builder::new()
            .name("cloud-model-loader".to_string())
            .spawn(move || {
                let event = match load() {
                    Ok(model) => ModelEvent::Ready(model),
                    Err(e) => ModelEvent::Failed(SkyError::Asset(format!("{:#}", e))),
                };
                if alive.load(Ordering::Acquire) {
                    let _ = worker_tx.send(event);
                } else {
                    log::debug!("Cloud field gone before model load finished, dropping result");
                }
            });

        let thread = match spawned {
            Ok(handle) => Some(handle),
            Err(e) => {
                let _ = tx.send(ModelEvent::Failed(SkyError::Asset(format!(
                    "could not start loader thread: {}",
                    e
                ))));
                None
            }
        };
        Self { rx, thread }
    }

    /// Load a glTF/GLB file in the background.
    pub fn gltf(path: PathBuf, alive: Arc<AtomicBool>) -> Self {
        Self::spawn(alive, move || CloudModel::load_gltf(&path))
    }

    /// Non-blocking check for the result.
    pub fn poll(&mut self) -> Option<ModelEvent> {
        let event = match self.rx.try_recv() {
            Ok(event) => event,
            Err(TryRecvError::Empty) => return None,
            Err(TryRecvError::Disconnected) => Self::exited_without_result(),
        };
        self.reap();
        Some(event)
    }

    /// Block up to `timeout` for the result.
    pub fn wait(&mut self, timeout: Duration) -> Option<ModelEvent> {
        let event = match self.rx.recv_timeout(timeout) {
            Ok(event) => event,
            Err(RecvTimeoutError::Timeout) => return None,
            Err(RecvTimeoutError::Disconnected) => Self::exited_without_result(),
        };
        self.reap();
        Some(event)
    }

    fn exited_without_result() -> ModelEvent {
        ModelEvent::Failed(SkyError::Asset("loader exited without a result".to_string()))
    }

    fn reap(&mut self) {
        if let Some(handle) = self.thread.take() {
            if handle.join().is_err() {
                log::warn!("Cloud model loader thread panicked");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alive() -> Arc<AtomicBool> {
        Arc::new(AtomicBool::new(true))
    }

    #[test]
    fn bounds_are_normalised_to_target_size() {
        let boxes = [
            (Vec3::new(-2.0, 0.0, -1.0), Vec3::new(0.0, 1.0, 1.0)),
            (Vec3::new(0.0, 0.0, -1.0), Vec3::new(2.0, 2.0, 1.0)),
        ];
        let model = CloudModel::from_bounds(&boxes).unwrap();
        // Overall extent is 4 on X -> factor 20.
        let t = model.templates();
        assert_eq!(t.len(), 2);
        assert!((t[0].offset - Vec3::new(-20.0, 10.0, 0.0)).length() < 1e-4);
        assert!((t[1].radius - 20.0).abs() < 1e-4);
    }

    #[test]
    fn empty_model_is_rejected() {
        assert!(CloudModel::from_bounds(&[]).is_err());
    }

    #[test]
    fn instantiate_scales_templates() {
        let model = CloudModel::from_bounds(&[(Vec3::splat(-1.0), Vec3::splat(1.0))]).unwrap();
        let puffs = model.instantiate(0.5, Vec3::ONE, 0.2);
        assert_eq!(puffs.len(), 1);
        assert!((puffs[0].radius - 20.0).abs() < 1e-4);
        assert_eq!(puffs[0].layer, PuffLayer::Model);
    }

    #[test]
    fn transformed_aabb_covers_rotated_box() {
        let m = Mat4::from_rotation_y(std::f32::consts::FRAC_PI_4);
        let (lo, hi) = transform_aabb(m, Vec3::splat(-1.0), Vec3::splat(1.0));
        let r = std::f32::consts::SQRT_2;
        assert!((hi.x - r).abs() < 1e-5 && (lo.x + r).abs() < 1e-5);
        assert!((hi.y - 1.0).abs() < 1e-5);
    }

    #[test]
    fn missing_file_fails_with_context() {
        let err = CloudModel::load_gltf(Path::new("/nonexistent/clouds.glb")).unwrap_err();
        assert!(format!("{:#}", err).contains("clouds.glb"));
    }

    #[test]
    fn loader_delivers_ready_model() {
        let mut loader = ModelLoader::spawn(alive(), || {
            CloudModel::from_bounds(&[(Vec3::ZERO, Vec3::ONE)])
        });
        match loader.wait(Duration::from_secs(5)) {
            Some(ModelEvent::Ready(model)) => assert_eq!(model.templates().len(), 1),
            other => panic!("expected ready model, got {:?}", other),
        }
    }

    #[test]
    fn loader_reports_failure() {
        let mut loader = ModelLoader::gltf(PathBuf::from("/nonexistent/clouds.glb"), alive());
        assert!(matches!(
            loader.wait(Duration::from_secs(5)),
            Some(ModelEvent::Failed(SkyError::Asset(_)))
        ));
    }

    #[test]
    fn result_is_dropped_once_owner_is_gone() {
        let flag = alive();
        flag.store(false, Ordering::Release);
        let mut loader = ModelLoader::spawn(flag, || CloudModel::from_bounds(&[(Vec3::ZERO, Vec3::ONE)]));
        // The worker finishes but never publishes, so the channel just closes.
        assert!(matches!(
            loader.wait(Duration::from_secs(5)),
            Some(ModelEvent::Failed(_))
        ));
    }
}

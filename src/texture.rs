//! Environment cubemaps.
//!
//! A cubemap is six square images, one per cube face, in the order
//! `+X, -X, +Y, -Y, +Z, -Z` (file stems `px, nx, py, ny, pz, nz`).
//!
//! Loading is split in two so it never blocks or fails the frame loop:
//!
//! 1. [`CubeTextureLoader::load`] decodes the faces on a background thread
//!    into [`CubeImages`]. A face that cannot be read is logged and replaced
//!    with black texels; decoding itself never fails.
//! 2. [`EnvironmentMaps::poll`] runs once per frame on the render thread and
//!    uploads any finished cube as a mipmapped [`CubeTexture`].
//!
//! Until a cube arrives, its [`EnvMapId`] resolves to nothing and the
//! renderer samples a black placeholder instead.

use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, TryRecvError};

use image::imageops::FilterType;
use image::{Rgba, RgbaImage};

use crate::error::Error;
use crate::gpu::GpuContext;

/// File stems of the six faces, in layer order.
pub const CUBE_FACES: [&str; 6] = ["px", "nx", "py", "ny", "pz", "nz"];

/// The six face paths `dir/{px,nx,py,ny,pz,nz}.{extension}`.
pub fn cube_face_paths(dir: impl AsRef<Path>, extension: &str) -> [PathBuf; 6] {
    let dir = dir.as_ref();
    CUBE_FACES.map(|stem| dir.join(format!("{stem}.{extension}")))
}

/// Decoded cube faces, all `size × size` RGBA8 (sRGB).
#[derive(Clone, Debug)]
pub struct CubeImages {
    pub size: u32,
    pub faces: [RgbaImage; 6],
    /// Layer indices of faces that failed to load and were filled with black.
    pub missing: Vec<usize>,
}

impl CubeImages {
    /// Decode six face images.
    ///
    /// The first face that decodes sets the cube size; other faces are
    /// resampled to it. Faces that fail to decode become black.
    pub fn decode(paths: &[PathBuf; 6]) -> Self {
        let mut decoded: [Option<RgbaImage>; 6] = paths.each_ref().map(|path| {
            match image::open(path) {
                Ok(img) => Some(img.to_rgba8()),
                Err(source) => {
                    let err = Error::Image {
                        path: path.clone(),
                        source,
                    };
                    log::warn!("{err}; using a black cube face");
                    None
                }
            }
        });

        let size = decoded
            .iter()
            .flatten()
            .next()
            .map(|img| img.width().max(1))
            .unwrap_or(1);

        let mut missing = Vec::new();
        let faces = std::array::from_fn(|layer| match decoded[layer].take() {
            Some(img) if img.dimensions() == (size, size) => img,
            Some(img) => {
                log::debug!(
                    "Resampling cube face {} from {}x{} to {size}x{size}",
                    CUBE_FACES[layer],
                    img.width(),
                    img.height()
                );
                image::imageops::resize(&img, size, size, FilterType::Triangle)
            }
            None => {
                missing.push(layer);
                RgbaImage::from_pixel(size, size, Rgba([0, 0, 0, 255]))
            }
        });

        Self {
            size,
            faces,
            missing,
        }
    }

    /// Six faces of one solid color.
    pub fn solid(size: u32, rgba: [u8; 4]) -> Self {
        let size = size.max(1);
        Self {
            size,
            faces: std::array::from_fn(|_| RgbaImage::from_pixel(size, size, Rgba(rgba))),
            missing: Vec::new(),
        }
    }

    /// Number of mip levels in a full chain down to 1×1.
    pub fn mip_level_count(&self) -> u32 {
        u32::BITS - self.size.max(1).leading_zeros()
    }

    /// The faces downsampled for mip `level` (level 0 is the faces themselves).
    pub fn mip_level(&self, level: u32) -> [RgbaImage; 6] {
        let size = (self.size >> level).max(1);
        std::array::from_fn(|layer| {
            if level == 0 {
                self.faces[layer].clone()
            } else {
                image::imageops::resize(&self.faces[layer], size, size, FilterType::Triangle)
            }
        })
    }

    pub fn is_complete(&self) -> bool {
        self.missing.is_empty()
    }
}

/// A mipmapped cube texture on the GPU.
#[derive(Debug)]
pub struct CubeTexture {
    #[allow(dead_code)]
    pub(crate) texture: wgpu::Texture,
    pub(crate) view: wgpu::TextureView,
    pub size: u32,
    pub mip_level_count: u32,
}

impl CubeTexture {
    /// Upload decoded faces, generating the mip chain on the CPU.
    pub fn from_images(gpu: &GpuContext, images: &CubeImages, label: &str) -> Self {
        let mip_level_count = images.mip_level_count();

        let texture = gpu.device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width: images.size,
                height: images.size,
                depth_or_array_layers: 6,
            },
            mip_level_count,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8UnormSrgb,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        for level in 0..mip_level_count {
            for (layer, face) in images.mip_level(level).iter().enumerate() {
                let (width, height) = face.dimensions();
                gpu.queue.write_texture(
                    wgpu::TexelCopyTextureInfo {
                        texture: &texture,
                        mip_level: level,
                        origin: wgpu::Origin3d {
                            x: 0,
                            y: 0,
                            z: layer as u32,
                        },
                        aspect: wgpu::TextureAspect::All,
                    },
                    face.as_raw(),
                    wgpu::TexelCopyBufferLayout {
                        offset: 0,
                        bytes_per_row: Some(4 * width),
                        rows_per_image: Some(height),
                    },
                    wgpu::Extent3d {
                        width,
                        height,
                        depth_or_array_layers: 1,
                    },
                );
            }
        }

        let view = texture.create_view(&wgpu::TextureViewDescriptor {
            label: Some(label),
            dimension: Some(wgpu::TextureViewDimension::Cube),
            ..Default::default()
        });

        Self {
            texture,
            view,
            size: images.size,
            mip_level_count,
        }
    }

    /// A 1×1 cube of a single color.
    pub fn solid(gpu: &GpuContext, rgba: [u8; 4], label: &str) -> Self {
        Self::from_images(gpu, &CubeImages::solid(1, rgba), label)
    }
}

/// A cube being decoded on a background thread.
pub struct PendingCubeTexture {
    receiver: Receiver<CubeImages>,
}

impl PendingCubeTexture {
    /// Take the decoded faces if they are ready. Never blocks.
    ///
    /// If the decoder thread died without sending, this yields an all-black
    /// cube so the slot still settles.
    pub fn try_take(&self) -> Option<CubeImages> {
        match self.receiver.try_recv() {
            Ok(images) => Some(images),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => {
                log::warn!("Cubemap decoder exited without a result");
                Some(CubeImages::solid(1, [0, 0, 0, 255]))
            }
        }
    }

    /// Block until the faces are decoded.
    pub fn wait(self) -> CubeImages {
        self.receiver
            .recv()
            .unwrap_or_else(|_| CubeImages::solid(1, [0, 0, 0, 255]))
    }
}

/// Fire-and-forget cubemap loading.
pub struct CubeTextureLoader;

impl CubeTextureLoader {
    /// Start decoding six face images in the background.
    pub fn load(paths: [PathBuf; 6]) -> PendingCubeTexture {
        let (sender, receiver) = mpsc::channel();

        let spawned = std::thread::Builder::new()
            .name("cubemap-loader".into())
            .spawn({
                let sender = sender.clone();
                let paths = paths.clone();
                move || {
                    let _ = sender.send(CubeImages::decode(&paths));
                }
            });

        if let Err(e) = spawned {
            log::warn!("Could not spawn cubemap loader thread ({e}); decoding inline");
            let _ = sender.send(CubeImages::decode(&paths));
        }

        PendingCubeTexture { receiver }
    }
}

/// Type-safe handle to an environment map in [`EnvironmentMaps`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct EnvMapId(pub(crate) usize);

struct EnvMapSlot {
    label: String,
    pending: Option<PendingCubeTexture>,
    texture: Option<CubeTexture>,
}

/// Storage for environment maps, loading or loaded.
#[derive(Default)]
pub struct EnvironmentMaps {
    slots: Vec<EnvMapSlot>,
    generation: u64,
}

impl EnvironmentMaps {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a cube that is still decoding.
    pub fn add_pending(&mut self, label: impl Into<String>, pending: PendingCubeTexture) -> EnvMapId {
        let id = EnvMapId(self.slots.len());
        self.slots.push(EnvMapSlot {
            label: label.into(),
            pending: Some(pending),
            texture: None,
        });
        id
    }

    /// Upload any cubes whose decoding finished. Returns `true` if anything
    /// arrived this call.
    pub fn poll(&mut self, gpu: &GpuContext) -> bool {
        let mut arrived = false;
        for slot in &mut self.slots {
            let Some(images) = slot.pending.as_ref().and_then(|p| p.try_take()) else {
                continue;
            };
            slot.pending = None;
            if images.is_complete() {
                log::debug!("Environment map '{}' loaded ({}px)", slot.label, images.size);
            } else {
                log::warn!(
                    "Environment map '{}' loaded with {} black face(s)",
                    slot.label,
                    images.missing.len()
                );
            }
            slot.texture = Some(CubeTexture::from_images(gpu, &images, &slot.label));
            arrived = true;
        }
        if arrived {
            self.generation += 1;
        }
        arrived
    }

    /// The uploaded cube for `id`, if it has arrived.
    pub fn get(&self, id: EnvMapId) -> Option<&CubeTexture> {
        self.slots.get(id.0).and_then(|slot| slot.texture.as_ref())
    }

    /// Bumped whenever a texture becomes available; bind groups built
    /// against an older generation are stale.
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("lustre-{}-{name}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn face_paths_follow_layer_order() {
        let paths = cube_face_paths("textures/environmentMaps/0", "jpg");
        assert_eq!(paths[0], PathBuf::from("textures/environmentMaps/0/px.jpg"));
        assert_eq!(paths[5], PathBuf::from("textures/environmentMaps/0/nz.jpg"));
    }

    #[test]
    fn missing_files_yield_a_black_cube() {
        let paths = cube_face_paths("/definitely/not/here", "jpg");
        let images = CubeImages::decode(&paths);
        assert_eq!(images.size, 1);
        assert_eq!(images.missing, vec![0, 1, 2, 3, 4, 5]);
        for face in &images.faces {
            assert_eq!(face.get_pixel(0, 0), &Rgba([0, 0, 0, 255]));
        }
    }

    #[test]
    fn partial_cube_fills_gaps_and_resamples() {
        let dir = scratch_dir("partial");
        RgbaImage::from_pixel(8, 8, Rgba([255, 0, 0, 255]))
            .save(dir.join("px.png"))
            .unwrap();
        RgbaImage::from_pixel(4, 4, Rgba([0, 255, 0, 255]))
            .save(dir.join("py.png"))
            .unwrap();
        std::fs::write(dir.join("pz.png"), b"not an image").unwrap();

        let images = CubeImages::decode(&cube_face_paths(&dir, "png"));
        assert_eq!(images.size, 8);
        assert_eq!(images.missing, vec![1, 3, 4, 5]);
        assert!(images.faces.iter().all(|f| f.dimensions() == (8, 8)));
        assert_eq!(images.faces[0].get_pixel(3, 3), &Rgba([255, 0, 0, 255]));
        assert_eq!(images.faces[2].get_pixel(3, 3), &Rgba([0, 255, 0, 255]));
        assert_eq!(images.faces[4].get_pixel(3, 3), &Rgba([0, 0, 0, 255]));

        std::fs::remove_dir_all(dir).ok();
    }

    #[test]
    fn background_loader_delivers() {
        let pending = CubeTextureLoader::load(cube_face_paths("/no/such/dir", "jpg"));
        let images = pending.wait();
        assert_eq!(images.missing.len(), 6);
    }

    #[test]
    fn mip_chain_reaches_one_texel() {
        let images = CubeImages::solid(16, [10, 20, 30, 255]);
        assert_eq!(images.mip_level_count(), 5);
        let last = images.mip_level(4);
        assert!(last.iter().all(|f| f.dimensions() == (1, 1)));
        assert_eq!(CubeImages::solid(1, [0; 4]).mip_level_count(), 1);
        assert_eq!(CubeImages::solid(6, [0; 4]).mip_level_count(), 3);
    }
}

use anyhow::Context as _;
use futures::channel::oneshot;

/// Layout shared by every phong material: uniform, emissive map and its sampler.
pub fn material_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        entries: &[
            wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: 1,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Texture {
                    multisampled: false,
                    view_dimension: wgpu::TextureViewDimension::D2,
                    sample_type: wgpu::TextureSampleType::Float { filterable: true },
                },
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: 2,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                count: None,
            },
        ],
        label: Some("material_bind_group_layout"),
    })
}

#[cfg(target_arch = "wasm32")]
fn format_url(file_name: &str) -> anyhow::Result<reqwest::Url> {
    let window = web_sys::window().context("no global window")?;
    let origin = window
        .location()
        .origin()
        .map_err(|e| anyhow::anyhow!("page origin unavailable: {e:?}"))?;
    let base = reqwest::Url::parse(&format!("{}/assets/", origin))?;
    Ok(base.join(file_name)?)
}

/// Whether a load failed because the asset does not exist, as opposed to
/// being unreadable or the server failing.
pub fn is_not_found(error: &anyhow::Error) -> bool {
    error.chain().any(|cause| {
        if let Some(io) = cause.downcast_ref::<std::io::Error>() {
            return io.kind() == std::io::ErrorKind::NotFound;
        }
        #[cfg(target_arch = "wasm32")]
        if let Some(http) = cause.downcast_ref::<reqwest::Error>() {
            return http.status() == Some(reqwest::StatusCode::NOT_FOUND);
        }
        false
    })
}

pub async fn load_string(file_name: &str) -> anyhow::Result<String> {
    #[cfg(target_arch = "wasm32")]
    let txt = {
        let url = format_url(file_name)?;
        reqwest::get(url).await?.error_for_status()?.text().await?
    };
    #[cfg(not(target_arch = "wasm32"))]
    let txt = {
        let path = std::path::Path::new("./").join("assets").join(file_name);
        tokio::fs::read_to_string(&path)
            .await
            .with_context(|| format!("could not read {}", path.display()))?
    };

    Ok(txt)
}

pub async fn load_binary(file_name: &str) -> anyhow::Result<Vec<u8>> {
    #[cfg(target_arch = "wasm32")]
    let data = {
        let url = format_url(file_name)?;
        reqwest::get(url)
            .await?
            .error_for_status()?
            .bytes()
            .await?
            .to_vec()
    };
    #[cfg(not(target_arch = "wasm32"))]
    let data = {
        let path = std::path::Path::new("./").join("assets").join(file_name);
        tokio::fs::read(&path)
            .await
            .with_context(|| format!("could not read {}", path.display()))?
    };

    Ok(data)
}

/// Fetches and decodes an image without touching the GPU.
pub async fn load_image(file_name: &str) -> anyhow::Result<image::DynamicImage> {
    let data = load_binary(file_name).await?;
    image::load_from_memory(&data).with_context(|| format!("could not decode {file_name}"))
}

/// An image being loaded in the background.
///
/// The render loop calls [`PendingImage::poll`] once per frame; it never
/// blocks.
#[derive(Debug)]
pub struct PendingImage {
    pub file_name: String,
    receiver: oneshot::Receiver<anyhow::Result<image::DynamicImage>>,
}

impl PendingImage {
    /// Wraps an already created channel. Mostly useful to feed images by hand.
    pub fn from_receiver(
        file_name: &str,
        receiver: oneshot::Receiver<anyhow::Result<image::DynamicImage>>,
    ) -> Self {
        Self {
            file_name: file_name.to_string(),
            receiver,
        }
    }

    /// `None` while the image is still on its way.
    pub fn poll(&mut self) -> Option<anyhow::Result<image::DynamicImage>> {
        match self.receiver.try_recv() {
            Ok(Some(result)) => Some(result),
            Ok(None) => None,
            Err(oneshot::Canceled) => Some(Err(anyhow::anyhow!(
                "loader of {} went away before finishing",
                self.file_name
            ))),
        }
    }
}

/// Starts loading `file_name` in the background.
///
/// On native this spawns onto the ambient tokio runtime, so it must be called
/// from within one.
pub fn request_image(file_name: &str) -> PendingImage {
    let (sender, receiver) = oneshot::channel();
    let name = file_name.to_string();
    let task = async move {
        let result = load_image(&name).await;
        // The receiver is gone if the app shut down first
        let _ = sender.send(result);
    };

    #[cfg(not(target_arch = "wasm32"))]
    tokio::spawn(task);
    #[cfg(target_arch = "wasm32")]
    wasm_bindgen_futures::spawn_local(task);

    PendingImage::from_receiver(file_name, receiver)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pending_image_waits_then_yields() {
        let (sender, receiver) = oneshot::channel();
        let mut pending = PendingImage::from_receiver("textures/earth.jpg", receiver);
        assert!(pending.poll().is_none());

        let img = image::DynamicImage::new_rgba8(2, 2);
        sender.send(Ok(img)).expect("receiver alive");
        let loaded = pending.poll().expect("ready").expect("image");
        assert_eq!(loaded.width(), 2);
    }

    #[test]
    fn dropped_loader_is_reported_as_error() {
        let (sender, receiver) = oneshot::channel::<anyhow::Result<image::DynamicImage>>();
        let mut pending = PendingImage::from_receiver("textures/moon.jpg", receiver);
        drop(sender);
        assert!(matches!(pending.poll(), Some(Err(_))));
    }

    #[tokio::test]
    async fn missing_file_fails_to_load() {
        let result = load_image("textures/does_not_exist.jpg").await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn missing_file_is_not_found() {
        let error = load_string("does_not_exist.ron").await.unwrap_err();
        assert!(is_not_found(&error));
    }

    #[tokio::test]
    async fn unreadable_path_is_not_a_missing_file() {
        // The asset root itself is a directory, not a file
        let error = load_string("").await.unwrap_err();
        assert!(!is_not_found(&error));

        let parse_error = anyhow::anyhow!("something else went wrong");
        assert!(!is_not_found(&parse_error));
    }
}

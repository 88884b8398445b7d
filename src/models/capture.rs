use base64::Engine;
use image::{DynamicImage, ImageFormat};

use crate::error::ImageError;

/// 从图片来源取到、并且已经确认能解码的图片
#[derive(Debug, Clone)]
pub struct CapturedImage {
    /// 来源中的文件名
    pub name: String,
    /// 原始字节
    pub bytes: Vec<u8>,
    format: ImageFormat,
}

impl CapturedImage {
    /// 校验字节是完整可解码的图片，损坏或不完整的数据返回错误
    pub fn decode_checked(name: impl Into<String>, bytes: Vec<u8>) -> Result<Self, ImageError> {
        let name = name.into();
        let format = image::guess_format(&bytes).map_err(|source| ImageError::Corrupt {
            name: name.clone(),
            source,
        })?;
        image::load_from_memory_with_format(&bytes, format).map_err(|source| {
            ImageError::Corrupt {
                name: name.clone(),
                source,
            }
        })?;

        Ok(Self {
            name,
            bytes,
            format,
        })
    }

    pub fn mime_type(&self) -> &'static str {
        match self.format {
            ImageFormat::Png => "image/png",
            ImageFormat::Jpeg => "image/jpeg",
            ImageFormat::Gif => "image/gif",
            ImageFormat::WebP => "image/webp",
            ImageFormat::Bmp => "image/bmp",
            ImageFormat::Tiff => "image/tiff",
            ImageFormat::Ico => "image/x-icon",
            ImageFormat::Avif => "image/avif",
            ImageFormat::Tga => "image/x-tga",
            ImageFormat::Pnm => "image/x-portable-anymap",
            ImageFormat::OpenExr => "image/x-exr",
            ImageFormat::Hdr => "image/vnd.radiance",
            _ => "application/octet-stream",
        }
    }

    pub fn to_base64(&self) -> String {
        base64::engine::general_purpose::STANDARD.encode(&self.bytes)
    }

    /// `data:<mime>;base64,<...>` 形式，OCR 和视觉模型都接受
    pub fn data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type(), self.to_base64())
    }

    /// 转成 RGB 并编码为 JPEG，用于存档
    pub fn to_rgb_jpeg(&self) -> Result<Vec<u8>, ImageError> {
        let decoded = image::load_from_memory_with_format(&self.bytes, self.format)
            .map_err(|source| ImageError::Corrupt {
                name: self.name.clone(),
                source,
            })?;
        let rgb = DynamicImage::ImageRgb8(decoded.to_rgb8());

        let mut out = std::io::Cursor::new(Vec::new());
        rgb.write_to(&mut out, image::ImageOutputFormat::Jpeg(90))
            .map_err(|source| ImageError::EncodeFailed { source })?;
        Ok(out.into_inner())
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use image::{DynamicImage, ImageOutputFormat, RgbImage};

    /// 生成一张很小的 PNG
    pub fn tiny_png() -> Vec<u8> {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(4, 4, image::Rgb([200, 30, 30])));
        let mut out = std::io::Cursor::new(Vec::new());
        img.write_to(&mut out, ImageOutputFormat::Png).unwrap();
        out.into_inner()
    }
}

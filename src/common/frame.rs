use chrono::{DateTime, Utc};
use image::{DynamicImage, GenericImageView};
use std::sync::Arc;
use uuid::Uuid;

/// One camera frame. The image buffer is shared, cloning a frame is cheap.
#[derive(Clone)]
pub struct Frame {
    frame_id: Uuid,
    index: u64,
    image: Arc<DynamicImage>,
    captured_at: DateTime<Utc>,
}

impl Frame {
    pub fn new(index: u64, image: DynamicImage, captured_at: DateTime<Utc>) -> Self {
        Self {
            frame_id: Uuid::new_v4(),
            index,
            image: Arc::new(image),
            captured_at,
        }
    }

    pub fn frame_id(&self) -> Uuid {
        self.frame_id
    }

    /// Monotonic capture index. The only cross-frame ordering guarantee the
    /// detector gets.
    pub fn index(&self) -> u64 {
        self.index
    }

    pub fn image(&self) -> &DynamicImage {
        &self.image
    }

    pub fn captured_at(&self) -> DateTime<Utc> {
        self.captured_at
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn center(&self) -> (f32, f32) {
        (self.width() as f32 / 2.0, self.height() as f32 / 2.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Rgb};

    #[test]
    fn cloning_frame_shares_image_buffer() {
        let img: DynamicImage = DynamicImage::ImageRgb8(
            ImageBuffer::<Rgb<u8>, Vec<u8>>::from_pixel(16, 16, Rgb([1, 2, 3])),
        );
        let f1 = Frame::new(0, img, Utc::now());
        let f2 = f1.clone();
        assert!(Arc::ptr_eq(&f1.image, &f2.image));
    }
}

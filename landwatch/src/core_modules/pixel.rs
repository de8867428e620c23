// THEORY (1D Pixel Heuristics):
// The `Pixel` module is the most fundamental unit of the change detector. It is a
// "dumb" data container for a single RGB pixel plus the one single-pixel heuristic
// the pipeline depends on: luminance. Anything that needs another pixel (smoothing,
// differencing, region statistics) belongs in the stage modules built on top.
//
// Luminance uses the Rec. 601 luma weights. A gray pixel replicated into three
// channels keeps its value exactly (0.299 + 0.587 + 0.114 = 1), so grayscale and
// color inputs go through the same path.

pub mod pixel {
    use image::{GrayImage, Luma, Rgb, RgbImage};

    pub type Channel = u8;
    pub type Luminance = f64;

    /// A "dumb" data container representing a single RGB pixel.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Pixel {
        /// The red channel value (0-255).
        pub red: Channel,
        /// The green channel value (0-255).
        pub green: Channel,
        /// The blue channel value (0-255).
        pub blue: Channel,
    }

    impl Pixel {
        pub fn new(red: Channel, green: Channel, blue: Channel) -> Self {
            Pixel { red, green, blue }
        }

        /// Luminance estimate (Rec. 601 luma) on the 0..255 scale.
        pub fn luminance(&self) -> Luminance {
            0.299_f64 * self.red as f64
                + 0.587_f64 * self.green as f64
                + 0.114_f64 * self.blue as f64
        }

        /// Luminance rounded back into an 8-bit channel.
        pub fn luma(&self) -> Channel {
            self.luminance().round().clamp(0.0, 255.0) as Channel
        }
    }

    impl From<&Rgb<u8>> for Pixel {
        fn from(rgb: &Rgb<u8>) -> Self {
            Pixel::new(rgb[0], rgb[1], rgb[2])
        }
    }

    /// Converts a whole image into a single-channel luminance grid.
    pub fn luminance_grid(image: &RgbImage) -> GrayImage {
        GrayImage::from_fn(image.width(), image.height(), |x, y| {
            Luma([Pixel::from(image.get_pixel(x, y)).luma()])
        })
    }
}

//! Tells animated rasters apart from static ones by asking the decoder of the
//! container's sniffed format, independent of the file extension.

use crate::error::Result;

use std::{
	fs::File,
	io::{BufReader, Read, Seek, SeekFrom},
	path::Path,
};

use image::{
	codecs::{gif::GifDecoder, png::PngDecoder, webp::WebPDecoder},
	AnimationDecoder, ImageFormat,
};
use tracing::trace;

/// Enough for every signature `image::guess_format` knows about
const SNIFF_LEN: usize = 16;

/// Whether the raster at `path` holds more than one frame.
///
/// Formats without animation support, and content no decoder recognizes, are static.
pub fn is_animated(path: impl AsRef<Path>) -> Result<bool> {
	let path = path.as_ref();
	let mut reader = BufReader::new(File::open(path)?);

	let mut header = [0u8; SNIFF_LEN];
	let read = read_up_to(&mut reader, &mut header)?;
	reader.seek(SeekFrom::Start(0))?;

	let animated = match image::guess_format(&header[..read]) {
		Ok(ImageFormat::Png) => PngDecoder::new(reader)?.is_apng(),
		Ok(ImageFormat::WebP) => WebPDecoder::new(reader)?.has_animation(),
		Ok(ImageFormat::Gif) => gif_has_many_frames(reader),
		Ok(_) | Err(_) => false,
	};

	trace!(path = %path.display(), animated, "Checked for animation");

	Ok(animated)
}

fn read_up_to(reader: &mut impl Read, buf: &mut [u8]) -> Result<usize> {
	let mut filled = 0;
	while filled < buf.len() {
		match reader.read(&mut buf[filled..])? {
			0 => break,
			n => filled += n,
		}
	}
	Ok(filled)
}

/// GIF has no animation flag, the second decodable frame is the tell
fn gif_has_many_frames(reader: BufReader<File>) -> bool {
	GifDecoder::new(reader).is_ok_and(|decoder| {
		decoder
			.into_frames()
			.take(2)
			.take_while(std::result::Result::is_ok)
			.count() > 1
	})
}

#[cfg(test)]
mod tests {
	use super::*;

	use crate::Error;

	use std::{fs, io::Cursor};

	use image::{codecs::gif::GifEncoder, Delay, Frame, Rgba, RgbaImage};
	use tempfile::tempdir;

	fn crc32(bytes: &[u8]) -> u32 {
		let mut crc = 0xFFFF_FFFFu32;
		for byte in bytes {
			crc ^= u32::from(*byte);
			for _ in 0..8 {
				crc = if crc & 1 == 1 {
					(crc >> 1) ^ 0xEDB8_8320
				} else {
					crc >> 1
				};
			}
		}
		!crc
	}

	fn png_chunk(kind: &[u8; 4], data: &[u8]) -> Vec<u8> {
		let mut chunk = u32::try_from(data.len()).unwrap().to_be_bytes().to_vec();
		let mut body = kind.to_vec();
		body.extend_from_slice(data);
		chunk.extend_from_slice(&body);
		chunk.extend_from_slice(&crc32(&body).to_be_bytes());
		chunk
	}

	fn still_png() -> Vec<u8> {
		let mut png = Cursor::new(vec![]);
		RgbaImage::from_pixel(4, 4, Rgba([0, 0, 0, 255]))
			.write_to(&mut png, ImageFormat::Png)
			.unwrap();
		png.into_inner()
	}

	#[test]
	fn static_png_is_not_animated() {
		let dir = tempdir().unwrap();
		let path = dir.path().join("still.png");
		fs::write(&path, still_png()).unwrap();

		assert!(!is_animated(&path).unwrap());
	}

	#[test]
	fn apng_is_detected_whatever_the_extension() {
		let dir = tempdir().unwrap();
		let path = dir.path().join("sneaky.jpg");

		// signature and IHDR come first, acTL has to precede the image data
		let mut data = still_png();
		let mut actl = 3u32.to_be_bytes().to_vec();
		actl.extend_from_slice(&0u32.to_be_bytes());
		let ihdr_end = 8 + 12 + 13;
		data.splice(ihdr_end..ihdr_end, png_chunk(b"acTL", &actl));
		fs::write(&path, data).unwrap();

		assert!(is_animated(&path).unwrap());
	}

	#[test]
	fn animated_gif_is_detected() {
		let dir = tempdir().unwrap();
		let path = dir.path().join("spinner.gif");

		{
			let mut file = fs::File::create(&path).unwrap();
			let mut encoder = GifEncoder::new(&mut file);
			for shade in [0u8, 128, 255] {
				encoder
					.encode_frame(Frame::from_parts(
						RgbaImage::from_pixel(4, 4, Rgba([shade, shade, shade, 255])),
						0,
						0,
						Delay::from_numer_denom_ms(100, 1),
					))
					.unwrap();
			}
		}

		assert!(is_animated(&path).unwrap());
	}

	#[test]
	fn animated_webp_is_told_apart_from_a_still_one() {
		let dir = tempdir().unwrap();
		let config = webp::WebPConfig::new().unwrap();

		let red = [255u8, 0, 0, 255].repeat(16);
		let blue = [0u8, 0, 255, 255].repeat(16);
		let mut encoder = webp::AnimEncoder::new(4, 4, &config);
		encoder.add_frame(webp::AnimFrame::from_rgba(&red, 4, 4, 0));
		encoder.add_frame(webp::AnimFrame::from_rgba(&blue, 4, 4, 100));

		let animated = dir.path().join("animated.webp");
		fs::write(&animated, &*encoder.encode()).unwrap();
		assert!(is_animated(&animated).unwrap());

		let still = dir.path().join("still.webp");
		fs::write(
			&still,
			&*webp::Encoder::from_rgba(&red, 4, 4).encode_lossless(),
		)
		.unwrap();
		assert!(!is_animated(&still).unwrap());
	}

	#[test]
	fn unknown_content_is_static() {
		let dir = tempdir().unwrap();
		let path = dir.path().join("notes.gif");
		fs::write(&path, b"hello").unwrap();

		assert!(!is_animated(&path).unwrap());
	}

	#[test]
	fn missing_file_is_an_error() {
		assert!(matches!(
			is_animated("/definitely/not/here.gif"),
			Err(Error::Io(_))
		));
	}
}

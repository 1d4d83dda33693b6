//! WAV renderer: encodes a rendered sample buffer as 16-bit mono PCM.

const BYTES_PER_FRAME: u16 = 2;
const HEADER_LEN: usize = 44;

/// Encode `samples` as a mono 16-bit WAV. Samples outside `[-1, 1]` are
/// clipped and NaN is written as silence.
pub fn render_wav(samples: &[f32], sample_rate: u32) -> Vec<u8> {
    let data_len = samples.len() * BYTES_PER_FRAME as usize;
    let mut wav = Vec::with_capacity(HEADER_LEN + data_len);
    write_header(&mut wav, sample_rate, data_len as u32);
    for &sample in samples {
        wav.extend_from_slice(&to_i16(sample).to_le_bytes());
    }
    wav
}

fn to_i16(sample: f32) -> i16 {
    if sample.is_nan() {
        return 0;
    }
    (sample.clamp(-1.0, 1.0) * i16::MAX as f32).round() as i16
}

// RIFF/WAVE header with a single PCM `fmt ` chunk, one channel.
fn write_header(out: &mut Vec<u8>, sample_rate: u32, data_len: u32) {
    let chunk = |out: &mut Vec<u8>, id: &[u8; 4], len: u32| {
        out.extend_from_slice(id);
        out.extend_from_slice(&len.to_le_bytes());
    };

    chunk(out, b"RIFF", HEADER_LEN as u32 - 8 + data_len);
    out.extend_from_slice(b"WAVE");

    chunk(out, b"fmt ", 16);
    out.extend_from_slice(&1u16.to_le_bytes()); // PCM
    out.extend_from_slice(&1u16.to_le_bytes()); // mono
    out.extend_from_slice(&sample_rate.to_le_bytes());
    out.extend_from_slice(&sample_rate.saturating_mul(BYTES_PER_FRAME as u32).to_le_bytes());
    out.extend_from_slice(&BYTES_PER_FRAME.to_le_bytes());
    out.extend_from_slice(&16u16.to_le_bytes());

    chunk(out, b"data", data_len);
}

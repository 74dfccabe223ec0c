// Track length lookup for files whose decoder can't say how long they are
// (VBR mp3 without a Xing/Info header is the usual suspect)

use std::fs::File;
use std::path::Path;
use std::time::Duration;
use symphonia::core::codecs::CODEC_TYPE_NULL;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::debug;

/// Container frame count first, then whatever length the tags claim.
pub fn probe_duration(path: &Path) -> Option<Duration> {
    let duration = duration_from_container(path).or_else(|| duration_from_tags(path));
    debug!(?duration, "Probed length of {}", path.display());
    duration
}

fn duration_from_container(path: &Path) -> Option<Duration> {
    let file = File::open(path).ok()?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(extension) = path.extension().and_then(|ext| ext.to_str()) {
        hint.with_extension(extension);
    }

    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .ok()?;

    let track = probed
        .format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)?;

    let time_base = track.codec_params.time_base?;
    let frames = track.codec_params.n_frames?;
    let time = time_base.calc_time(frames);
    Some(Duration::from_secs(time.seconds) + Duration::from_secs_f64(time.frac))
}

fn duration_from_tags(path: &Path) -> Option<Duration> {
    use id3::TagLike;

    let extension = path.extension()?.to_str()?.to_lowercase();
    match extension.as_str() {
        // TLEN, in milliseconds
        "mp3" => {
            let tag = id3::Tag::read_from_path(path).ok()?;
            tag.duration().map(|ms| Duration::from_millis(u64::from(ms)))
        }
        "m4a" | "mp4" => {
            let tag = mp4ameta::Tag::read_from_path(path).ok()?;
            tag.duration()
        }
        _ => None,
    }
}

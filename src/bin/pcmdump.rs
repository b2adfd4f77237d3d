//! Dump a WAV or Ogg-Vorbis file as raw interleaved 16-bit LE PCM.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use anyhow::{bail, Context, Result};
use sounddec::{create_decoder, AudioType};

fn main() -> Result<()> {
    env_logger::init();

    let mut args = std::env::args().skip(1);
    let input = match args.next() {
        Some(path) => path,
        None => bail!("usage: pcmdump <file.wav|file.ogg> [out.raw]"),
    };
    let output = args.next().unwrap_or_else(|| format!("{}.raw", input));

    let kind = match Path::new(&input).extension().and_then(|e| e.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("wav") => AudioType::Wav,
        Some(ext) if ext.eq_ignore_ascii_case("ogg") => AudioType::Ogg,
        _ => AudioType::None,
    };

    let file = File::open(&input).with_context(|| format!("failed to open {}", input))?;
    let size = file.metadata()?.len();

    let mut decoder = match create_decoder(file, kind, size) {
        Some(decoder) => decoder,
        None => bail!("could not load sound: {}", input),
    };

    log::info!(
        "{}: {} ch, {} Hz, {} samples",
        input,
        decoder.channels(),
        decoder.sample_rate(),
        decoder.total_samples(),
    );

    let mut out = BufWriter::new(
        File::create(&output).with_context(|| format!("failed to create {}", output))?,
    );
    let mut buf = [0i16; 4096];
    let mut total = 0u64;
    loop {
        let n = decoder.read(&mut buf);
        if n == 0 {
            break;
        }
        for sample in &buf[..n] {
            out.write_all(&sample.to_le_bytes())?;
        }
        total += n as u64;
    }
    out.flush()?;

    log::info!("wrote {} samples to {}", total, output);
    Ok(())
}

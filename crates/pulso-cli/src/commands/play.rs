//! Play a WAV through the engine with an optional effect chain.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::bail;
use clap::Args;

use pulso_effects::EffectKind;
use pulso_engine::create_engine;
use pulso_io::{CpalHost, RenderHost, StreamConfig, read_wav, renderer_callback};

#[derive(Args)]
pub struct PlayArgs {
    /// WAV file to play
    pub input: PathBuf,

    /// Effect to insert (see `pulso effects`)
    #[arg(long)]
    pub effect: Option<String>,

    /// Wet/dry mix for the chain
    #[arg(long, default_value_t = 0.5)]
    pub mix: f32,

    /// Output device name filter
    #[arg(long)]
    pub device: Option<String>,
}

pub fn run(args: PlayArgs) -> anyhow::Result<()> {
    let buffer = read_wav(&args.input)?;
    let duration = buffer.duration_seconds();

    let (mut controller, renderer) = create_engine(buffer.sample_rate);
    if let Some(tag) = &args.effect {
        let Some(kind) = EffectKind::from_id(tag) else {
            bail!("unknown effect \"{tag}\" (see `pulso effects`)");
        };
        let chain = controller.create_chain("main", 4)?;
        controller.add_effect(chain, kind, &[])?;
        controller.set_mix(chain, args.mix)?;
    }

    let left = buffer.channels[0].clone();
    let right = buffer
        .channels
        .get(1)
        .cloned()
        .unwrap_or_else(|| left.clone());
    let mut position = 0usize;
    let callback = renderer_callback(renderer, move |l, r| {
        for i in 0..l.len() {
            l[i] = left.get(position).copied().unwrap_or(0.0);
            r[i] = right.get(position).copied().unwrap_or(0.0);
            position += 1;
        }
    });

    let host = CpalHost::new();
    let config = StreamConfig {
        sample_rate: buffer.sample_rate as u32,
        buffer_size: 256,
        device_name: args.device.clone(),
    };
    let _stream = host.build_output_stream(
        &config,
        callback,
        Box::new(|err| eprintln!("stream error: {err}")),
    )?;

    println!("Playing {} ({duration:.1}s)…", args.input.display());
    // Poll metering while the track runs.
    let mut remaining = duration + 0.5;
    while remaining > 0.0 {
        std::thread::sleep(Duration::from_millis(500));
        remaining -= 0.5;
        let metering = controller.metering();
        print!(
            "\r  peak L {:>5.2}  R {:>5.2}   rms L {:>5.2}  R {:>5.2}  ",
            metering.peak.l, metering.peak.r, metering.rms.l, metering.rms.r
        );
        use std::io::Write;
        let _ = std::io::stdout().flush();
        controller.collect_garbage();
    }
    println!();
    Ok(())
}

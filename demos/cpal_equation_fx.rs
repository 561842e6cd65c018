// Copyright (c) 2022 Weird Constructor <weirdconstructor@gmail.com>
// This file is a part of synfx-dsp-expr. Released under GPL-3.0-or-later.
// See README.md and COPYING for details.

use synfx_dsp_expr::engine::{EquationBackend, EquationEngine};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};

fn main() {
    tracing_subscriber::fmt::init();

    let mut engine = EquationEngine::new();
    let backend = engine.get_backend();

    engine.set_debug(true);

    start_backend(backend, move || {
        let equations = [
            "0.5*x",
            "0.5*x + 0.5*z^-11025",
            "0.3*x + 0.7*y_prev",
            "sin(4*x)*0.5",
            "x +",
        ];
        let mut i = 0;
        loop {
            engine.query_returns();

            let equation = equations[i];
            i = (i + 1) % equations.len();

            match engine.set_equation(equation) {
                Ok(()) => println!("{}", engine.get_debug_info()),
                Err(e) => println!("'{}' rejected, passing through: {}", equation, e),
            }
            println!("last output: {:6.4}", engine.last_output());

            std::thread::sleep(std::time::Duration::from_millis(1500));
        }
    });
}

pub fn run<T, F: FnMut()>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    mut backend: EquationBackend,
    mut frontend_loop: F,
) -> Result<(), anyhow::Error>
where
    T: cpal::Sample,
{
    let sample_rate = config.sample_rate.0 as f32;
    let channels = config.channels as usize;

    backend.set_sample_rate(sample_rate);

    // A 220Hz sine serves as the input signal of the effect.
    let mut phase = 0.0_f32;
    let phase_inc = 220.0 / sample_rate;

    let err_fn = |err| eprintln!("an error occurred on stream: {}", err);
    let stream = device.build_output_stream(
        config,
        move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
            backend.process_updates();

            let mut out_iter = data.chunks_mut(channels);
            while let Some(frame) = out_iter.next() {
                let input = (phase * std::f32::consts::TAU).sin() * 0.5;
                phase = (phase + phase_inc).fract();

                let out = backend.process(input).clamp(-1.0, 1.0);

                for sample in frame.iter_mut() {
                    let value: T = cpal::Sample::from::<f32>(&out);
                    *sample = value;
                }
            }
        },
        err_fn,
    )?;
    stream.play()?;

    frontend_loop();

    Ok(())
}

// This function starts the CPAL backend and
// runs the audio loop with the EquationBackend.
fn start_backend<F: FnMut()>(backend: EquationBackend, frontend_loop: F) {
    let host = cpal::default_host();
    let device = host.default_output_device().expect("Finding useable audio device");
    let config = device.default_output_config().expect("A workable output config");

    match config.sample_format() {
        cpal::SampleFormat::F32 => run::<f32, F>(&device, &config.into(), backend, frontend_loop),
        cpal::SampleFormat::I16 => run::<i16, F>(&device, &config.into(), backend, frontend_loop),
        cpal::SampleFormat::U16 => run::<u16, F>(&device, &config.into(), backend, frontend_loop),
    }
    .expect("cpal works fine");
}

use approx::assert_relative_eq;
use bandviz_core::{
    readout_for, AggregationMode, Pipeline, SampleFormat, StreamFormat, VisualizerConfig,
};
use std::f32::consts::TAU;

fn mono(sample_rate: u32) -> StreamFormat {
    StreamFormat {
        sample_rate,
        channel_count: 1,
        sample_format: SampleFormat::F32,
    }
}

fn sine(frequency: f32, sample_rate: u32, len: usize, amplitude: f32) -> Vec<f32> {
    (0..len)
        .map(|i| amplitude * (TAU * frequency * i as f32 / sample_rate as f32).sin())
        .collect()
}

#[test]
fn frames_are_signalled_every_n_samples() {
    let config = VisualizerConfig {
        frame_size: 8,
        ..VisualizerConfig::default()
    };
    let mut pipeline = Pipeline::new(&config).unwrap();
    pipeline.on_format_negotiated(mono(8)).unwrap();

    let mut numbers = Vec::new();
    for chunk in vec![0.1f32; 20].chunks(3) {
        pipeline.on_samples_available(Some(chunk), |analysis| numbers.push(analysis.frame_number));
    }
    assert_eq!(numbers, [1, 2]);
    assert_eq!(pipeline.frames_analyzed(), 2);
}

#[test]
fn dc_input_leaves_every_named_band_empty() {
    let config = VisualizerConfig {
        frame_size: 8,
        ..VisualizerConfig::default()
    };
    let mut pipeline = Pipeline::new(&config).unwrap();
    pipeline.on_format_negotiated(mono(8)).unwrap();

    let mut seen = 0;
    pipeline.on_samples_available(Some(&[1.0f32; 8][..]), |analysis| {
        seen += 1;
        let labels: Vec<&str> = analysis.readings.iter().map(|r| r.label.as_str()).collect();
        assert_eq!(labels, ["Bass", "Mid", "Treble"]);
        for reading in analysis.readings {
            assert!(reading.raw.abs() < 1e-6, "{} = {}", reading.label, reading.raw);
            assert!(reading.peak.abs() < 1e-6);
        }
        // The energy sits in the DC bin that no band covers.
        assert!(analysis.spectrum[0] > 0.4);
    });
    assert_eq!(seen, 1);
}

#[test]
fn bass_tone_lights_up_the_bass_band() {
    let config = VisualizerConfig::default();
    let mut pipeline = Pipeline::new(&config).unwrap();
    pipeline.on_format_negotiated(mono(44100)).unwrap();

    let block = sine(100.0, 44100, config.frame_size, 0.5);
    pipeline.on_samples_available(Some(block.as_slice()), |_| {});

    let readings = pipeline.readings();
    assert!(readings[0].raw > readings[1].raw * 10.0);
    assert!(readings[0].raw > readings[2].raw * 10.0);
    assert_eq!(readings[0].peak, readings[0].raw);
}

#[test]
fn peaks_decay_after_the_tone_stops() {
    let config = VisualizerConfig::default();
    let mut pipeline = Pipeline::new(&config).unwrap();
    pipeline.on_format_negotiated(mono(44100)).unwrap();

    let tone = sine(1000.0, 44100, config.frame_size, 0.8);
    pipeline.on_samples_available(Some(tone.as_slice()), |_| {});
    let held = pipeline.readings()[1].peak;
    assert!(held > 0.0);

    let silence = vec![0.0f32; config.frame_size];
    pipeline.on_samples_available(Some(silence.as_slice()), |_| {});
    let reading = &pipeline.readings()[1];
    assert_eq!(reading.raw, 0.0);
    assert_relative_eq!(reading.peak, held * config.decay_rate);

    pipeline.on_samples_available(Some(silence.as_slice()), |_| {});
    assert!(pipeline.readings()[1].peak < held * config.decay_rate);
}

#[test]
fn bucket_mode_over_five_bins() {
    let config = VisualizerConfig {
        frame_size: 8,
        mode: AggregationMode::Buckets {
            count: 4,
            db_floor: -80.0,
            db_ceil: -20.0,
        },
        ..VisualizerConfig::default()
    };
    let mut pipeline = Pipeline::new(&config).unwrap();
    pipeline.on_format_negotiated(mono(8)).unwrap();

    let ranges = pipeline.aggregator().ranges().to_vec();
    assert_eq!(ranges, vec![0..1, 1..2, 2..3, 3..5]);

    let block = sine(2.0, 8, 8, 0.5);
    let mut energies = Vec::new();
    pipeline.on_samples_available(Some(block.as_slice()), |analysis| {
        assert_eq!(analysis.spectrum.len(), 5);
        energies = analysis.readings.iter().map(|r| r.raw).collect();
    });

    assert_eq!(energies.len(), 4);
    assert!(energies.iter().all(|e| (0.0..=1.0).contains(e)));
    // Bucket 0 only holds the excluded DC bin.
    assert_eq!(energies[0], 0.0);
    // The 2 Hz tone lands in bin 2 and, through the window, its neighbours.
    assert!(energies[2] > 0.9);
}

#[test]
fn readout_renders_a_band_frame() {
    let config = VisualizerConfig {
        frame_size: 8,
        ..VisualizerConfig::default()
    };
    let readout = readout_for(&config);
    let mut pipeline = Pipeline::new(&config).unwrap();
    pipeline.on_format_negotiated(mono(8)).unwrap();

    let mut line = String::new();
    pipeline.on_samples_available(Some(&[1.0f32; 8][..]), |analysis| {
        readout.compose(analysis.readings, &mut line);
    });

    let empty = ".".repeat(config.bar_width);
    assert_eq!(
        line,
        format!(
            "Bass   [{e}] r:0.000 p:0.000  Mid    [{e}] r:0.000 p:0.000  Treble [{e}] r:0.000 p:0.000",
            e = empty
        )
    );
}

#[test]
fn bucket_readout_has_one_line_per_bucket() {
    let config = VisualizerConfig {
        frame_size: 64,
        mode: AggregationMode::Buckets {
            count: 8,
            db_floor: -80.0,
            db_ceil: -20.0,
        },
        ..VisualizerConfig::default()
    };
    let readout = readout_for(&config);
    let mut pipeline = Pipeline::new(&config).unwrap();
    pipeline.on_format_negotiated(mono(6400)).unwrap();

    let block = sine(1000.0, 6400, 64, 0.5);
    let mut text = String::new();
    pipeline.on_samples_available(Some(block.as_slice()), |analysis| {
        readout.compose(analysis.readings, &mut text);
    });

    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), readout.line_count(pipeline.band_count()));
    assert!(lines[0].starts_with("    0Hz ["));
    assert!(lines[1].starts_with("  400Hz ["));
    assert!(lines.iter().all(|l| l.ends_with(']')));
}

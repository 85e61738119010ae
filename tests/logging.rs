use fouriermix::logger::{self, LogLevel};
use fouriermix::{MixerSettings, SpectralImage, SpectralMixer, WeightPair};

#[test]
fn session_log_records_mixing() {
    let dir = tempfile::tempdir().unwrap();
    let settings = MixerSettings {
        log_dir: Some(dir.path().join("logs")),
        console_level: LogLevel::Error,
        ..MixerSettings::default()
    };
    logger::init(&settings);

    let path = logger::log_path().expect("log file should be open").clone();
    assert!(path.starts_with(dir.path()));
    let name = path.file_name().unwrap().to_string_lossy().into_owned();
    assert!(name.starts_with("ImageMixer_"));

    let a = SpectralImage::from_raw(4, 4, vec![10; 16]).unwrap();
    let mixer = SpectralMixer::new([&a], None).unwrap();
    mixer.mix_magnitude_phase(&[WeightPair(1.0, 1.0)]).unwrap();
    fouriermix::log_warn!("custom {}", 42);

    let content = std::fs::read_to_string(&path).unwrap();
    assert!(content.contains("FourierMix session started"));
    assert!(content.contains("[INFO] Mixer over 1 images, no frequency mask"));
    assert!(content.contains("[DEBUG] Mix stage InverseComputed (100%)"));
    assert!(content.contains("[WARN] custom 42"));
}

//! Integration tests for catena-config.
//!
//! These tests go from text on disk to processed audio: setup files are
//! written and read through a temporary directory, built against the full
//! registry and run through real blocks.

use catena_config::{
    ChainDefinition, ChainSetup, ConfigError, EngineSettings, ParseError, Registry, load_presets,
    parse_chain,
};
use catena_core::{Operator, SampleBuffer};
use tempfile::TempDir;

fn run_block(chain: &mut catena_core::Chain, channels: usize, value: f32) -> SampleBuffer {
    let mut buffer = SampleBuffer::new(channels, 64, 48000);
    {
        let mut running = chain.init(&mut buffer, channels, channels);
        for ch in running.buffer_mut().channels_mut() {
            ch.fill(value);
        }
        running.process();
    }
    buffer
}

// ============================================================================
// Chain strings
// ============================================================================

/// A parsed chain processes audio the way its clauses say.
#[test]
fn test_parsed_chain_processes_audio() {
    let registry = Registry::new();
    let mut chain = parse_chain("-ea:200 -eal:50", &registry).unwrap();
    let out = run_block(&mut chain, 2, 0.4);
    // 0.4 doubled to 0.8, then limited to half scale.
    assert!(out.channels().all(|ch| ch.iter().all(|&s| s == 0.5)));
}

/// Controllers parsed from the string rewrite their target during
/// processing.
#[test]
fn test_parsed_controller_drives_target() {
    let registry = Registry::new();
    // A linear envelope over 1 s writing 0..100 into the amplifier.
    let mut chain = parse_chain("-ea:100 -kl:1,0,100,1", &registry).unwrap();
    let out = run_block(&mut chain, 1, 1.0);
    assert_eq!(out.channel(0)[0], 0.0);
    assert_eq!(chain.chain_operator(1).map(|op| op.get_parameter(1)), Some(0.0));
}

/// Errors carry the byte position of the offending clause.
#[test]
fn test_parse_errors_point_at_clause() {
    let registry = Registry::new();
    let text = "-ea:100 -efl:800 -nope:1";
    let err = parse_chain(text, &registry).unwrap_err();
    assert_eq!(err.position(), 17);
    assert!(text[err.position()..].starts_with("-nope"));
    assert!(matches!(err, ParseError::UnknownKeyword { .. }));
}

// ============================================================================
// Setup files
// ============================================================================

/// Save and reload in both formats through a temp directory.
#[test]
fn test_setup_file_round_trip() {
    let temp = TempDir::new().unwrap();
    let setup = ChainSetup::new("session")
        .with_settings(
            EngineSettings::default()
                .with_buffer_size(256)
                .with_output_bits(24),
        )
        .with_chain(ChainDefinition::new("left", "-eac:80,1 -etd:120,0,2,50"))
        .with_chain(ChainDefinition::new("right", "-efh:120 -kos:1,100,400,0.2,0"));

    let toml_path = temp.path().join("nested/dir/session.toml");
    setup.save(&toml_path).unwrap();
    assert_eq!(ChainSetup::load(&toml_path).unwrap(), setup);

    let text_path = temp.path().join("session.ecs");
    setup.save(&text_path).unwrap();
    let content = std::fs::read_to_string(&text_path).unwrap();
    assert!(content.contains("-a:left -eac:80,1 -etd:120,0,2,50"), "{content}");
    assert_eq!(ChainSetup::load(&text_path).unwrap(), setup);
}

/// A loaded setup builds chains that run.
#[test]
fn test_loaded_setup_builds_and_runs() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("mix.toml");
    std::fs::write(
        &path,
        r#"
name = "mix"

[settings]
sample_rate = 44100

[[chains]]
name = "quiet"
operators = "-ea:50"

[[chains]]
name = "off"
operators = "-ea:300"
muted = true
"#,
    )
    .unwrap();

    let registry = Registry::new();
    let setup = ChainSetup::load(&path).unwrap();
    assert_eq!(setup.settings.sample_rate, 44100);
    assert_eq!(setup.settings.buffer_size, 1024);

    let mut chains = setup.build(&registry).unwrap();
    let quiet = run_block(&mut chains[0], 1, 0.5);
    assert_eq!(quiet.channel(0)[0], 0.25);
    let off = run_block(&mut chains[1], 1, 0.5);
    assert!(off.is_silent());
}

/// Missing files and broken content produce typed errors.
#[test]
fn test_load_errors() {
    let temp = TempDir::new().unwrap();
    let missing = temp.path().join("missing.toml");
    assert!(matches!(
        ChainSetup::load(&missing),
        Err(ConfigError::ReadFile { .. })
    ));

    let broken = temp.path().join("broken.toml");
    std::fs::write(&broken, "name = [").unwrap();
    assert!(matches!(
        ChainSetup::load(&broken),
        Err(ConfigError::TomlParse(_))
    ));

    let bad_text = temp.path().join("bad.ecs");
    std::fs::write(&bad_text, "-a:main -ea:1\n-zz:3\n").unwrap();
    assert!(matches!(
        ChainSetup::load(&bad_text),
        Err(ConfigError::InvalidLine { line: 2, .. })
    ));
}

/// A live chain survives capture, save, load and rebuild.
#[test]
fn test_capture_save_rebuild() {
    let temp = TempDir::new().unwrap();
    let registry = Registry::new();
    let text = "-ea:90 -kos:1,0,100,0.5,0 -kx -kl:3,100,200,4 -epp:40";
    let chain = parse_chain(text, &registry).unwrap();

    let setup = ChainSetup::from_chains("snap", EngineSettings::default(), [&chain]);
    let path = temp.path().join("snap.toml");
    setup.save(&path).unwrap();

    let rebuilt = ChainSetup::load(&path)
        .unwrap()
        .build_chain("default", &registry)
        .unwrap();
    assert_eq!(rebuilt.to_string(), text);
    assert_eq!(rebuilt.number_of_controllers(), 2);
}

// ============================================================================
// Presets and stamps
// ============================================================================

/// A preset library on disk feeds `-pn` clauses of a setup file.
#[test]
fn test_preset_library_and_setup_presets() {
    let dir = TempDir::new().unwrap();
    let library = dir.path().join("effect_presets");
    std::fs::write(&library, "# gain stages
half = -ea:50
both = -ea:%a | \
  -ea:%b
").unwrap();
    let mut registry = Registry::new();
    assert_eq!(load_presets(&library, &mut registry).unwrap(), 2);

    let setup_path = dir.path().join("presets.toml");
    std::fs::write(
        &setup_path,
        r#"
name = "presets"

[presets]
quarter = "-pn:half -pn:half"

[[chains]]
name = "main"
operators = "-pn:quarter -pn:both,100,300"
"#,
    )
    .unwrap();
    let setup = ChainSetup::load(&setup_path).unwrap();
    let mut chains = setup.build(&registry).unwrap();
    let out = run_block(&mut chains[0], 1, 1.0);
    // 1.0 / 4, then the mean of x1 and x3.
    assert!(out.channel(0).iter().all(|&s| (s - 0.5).abs() < 1e-6));
}

/// A stamp written by one chain steers a controller in another, as long as
/// both come from the same registry.
#[test]
fn test_stamp_links_chains() {
    let registry = Registry::new();
    let mut source = parse_chain("-ea:50 -eS:3", &registry).unwrap();
    let mut follower = parse_chain("-ea:100 -ksv:1,0,100,3,1", &registry).unwrap();

    run_block(&mut source, 2, 1.0);
    assert!(registry.stamps().contains(3));
    let out = run_block(&mut follower, 1, 1.0);
    assert_eq!(out.channel(0)[0], 0.5);
}

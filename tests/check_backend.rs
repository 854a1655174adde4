mod common;

use common::{strings_at, valid_main_source, Fixture};

const PLAY_EVENT: &str = r#"from cleep.libs.internals.event import Event


class AudioPlayEvent(Event):
    """
    Sound played
    """

    EVENT_NAME = "audio.sound.play"
    EVENT_PROPAGATE = False
    EVENT_PARAMS = ["filepath"]

    def __init__(self, params):
        Event.__init__(self, params)
"#;

const ALSA_DRIVER: &str = r#"from cleep.libs.internals.driver import Driver

class AlsaDriver(Driver):
    def __init__(self, driver_name):
        Driver.__init__(self, Driver.DRIVER_AUDIO, driver_name)
"#;

const PROFILE_FORMATTER: &str = r#"from cleep.libs.internals.profileformatter import ProfileFormatter
from cleep.profiles.soundprofile import SoundProfile

class AudioFormatter(ProfileFormatter):
    def __init__(self, events_broker):
        ProfileFormatter.__init__(self, events_broker, "audio.sound.play", SoundProfile())
"#;

fn valid_module(fixture: &Fixture) {
    fixture.install_valid_backend("audio", "Audio");
    fixture.write_backend("audio", "audioplayevent.py", PLAY_EVENT);
    fixture.write_backend("audio", "audioformatter.py", PROFILE_FORMATTER);
    fixture.write_backend("audio", "drivers/__init__.py", "");
    fixture.write_backend("audio", "drivers/alsadriver.py", ALSA_DRIVER);
    fixture.write_backend("audio", "libs/__init__.py", "");
    fixture.write_backend(
        "audio",
        "libs/helper.py",
        "def clamp(value):\n    return max(0, min(100, value))\n",
    );
}

#[test]
fn valid_backend_classifies_role_files() {
    let fixture = Fixture::new();
    valid_module(&fixture);

    let (output, summary) = fixture.modcheck_json("audio", &["--backend"]);
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    assert!(strings_at(&summary, "/backend/errors").is_empty());
    assert!(strings_at(&summary, "/backend/warnings").is_empty());
    assert!(summary.get("frontend").is_none());

    let files = &summary["backend"]["files"];
    assert_eq!(files["module"]["path"], "audio/audio.py");
    assert_eq!(files["events"][0]["classname"], "AudioPlayEvent");
    assert_eq!(files["events"][0]["path"], "audio/audioplayevent.py");
    assert_eq!(files["drivers"][0]["classname"], "AlsaDriver");
    assert_eq!(files["formatters"][0]["classname"], "AudioFormatter");
    let libs: Vec<&str> = files["libs"]
        .as_array()
        .expect("libs")
        .iter()
        .filter_map(|lib| lib["path"].as_str())
        .collect();
    assert_eq!(libs, vec!["audio/libs/helper.py"]);

    let metadata = &summary["backend"]["metadata"];
    assert_eq!(metadata["category"], "MEDIA");
    assert_eq!(metadata["version"], "1.2.3");
    assert_eq!(metadata["label"], "Audio");
    assert_eq!(
        metadata["longdescription"],
        "Plays sounds on the device through the configured card"
    );
}

#[test]
fn missing_author_is_reported_once() {
    let fixture = Fixture::new();
    fixture.write_backend("audio", "__init__.py", "");
    let source = valid_main_source("Audio").replace("    MODULE_AUTHOR = \"Cleep\"\n", "");
    fixture.write_backend("audio", "audio.py", &source);

    let (output, summary) = fixture.modcheck_json("audio", &["--backend"]);
    assert!(!output.status.success());
    assert_eq!(
        strings_at(&summary, "/backend/errors"),
        vec!["Constant \"MODULE_AUTHOR\" is missing".to_string()]
    );
}

const AUDIO_BASE: &str = r#"from cleep.core import CleepModule

AUTHOR = "Cleep"


class AudioBase(CleepModule):
    MODULE_AUTHOR = AUTHOR
    MODULE_VERSION = "0.0.1"
"#;

#[test]
fn constants_are_inherited_from_local_base_class() {
    let fixture = Fixture::new();
    fixture.write_backend("audio", "__init__.py", "");
    fixture.write_backend("audio", "audiobase.py", AUDIO_BASE);
    let source = valid_main_source("Audio")
        .replace("    MODULE_AUTHOR = \"Cleep\"\n", "")
        .replace("from cleep.core import CleepModule", "from .audiobase import AudioBase")
        .replace("class Audio(CleepModule):", "class Audio(AudioBase):");
    fixture.write_backend("audio", "audio.py", &source);

    let (output, summary) = fixture.modcheck_json("audio", &["--backend"]);
    assert!(output.status.success(), "stdout: {}", String::from_utf8_lossy(&output.stdout));
    assert!(strings_at(&summary, "/backend/errors").is_empty());
    let metadata = &summary["backend"]["metadata"];
    assert_eq!(metadata["author"], "Cleep");
    assert_eq!(metadata["version"], "1.2.3");
}

#[test]
fn declared_none_label_is_kept() {
    let fixture = Fixture::new();
    fixture.write_backend("audio", "__init__.py", "");
    let source =
        valid_main_source("Audio").replace("MODULE_LABEL = \"Audio\"", "MODULE_LABEL = None");
    fixture.write_backend("audio", "audio.py", &source);

    let (output, summary) = fixture.modcheck_json("audio", &["--backend"]);
    assert!(output.status.success());
    assert!(summary["backend"]["metadata"]["label"].is_null());
}

#[test]
fn version_must_have_three_parts() {
    let fixture = Fixture::new();
    fixture.write_backend("audio", "__init__.py", "");
    let source = valid_main_source("Audio").replace("\"1.2.3\"", "\"1.2\"");
    fixture.write_backend("audio", "audio.py", &source);

    let (_, summary) = fixture.modcheck_json("audio", &["--backend"]);
    assert_eq!(
        strings_at(&summary, "/backend/errors"),
        vec!["MODULE_VERSION must follow semver rules https://semver.org/".to_string()]
    );
}

#[test]
fn country_code_must_have_two_letters() {
    let fixture = Fixture::new();
    fixture.write_backend("audio", "__init__.py", "");
    let source = valid_main_source("Audio")
        .replace("MODULE_COUNTRY = None", "MODULE_COUNTRY = \"USA\"");
    fixture.write_backend("audio", "audio.py", &source);
    let (_, summary) = fixture.modcheck_json("audio", &["--backend"]);
    assert_eq!(
        strings_at(&summary, "/backend/errors"),
        vec!["Constant MODULE_COUNTRY must be ISO3166-2 compatible code".to_string()]
    );

    let source = valid_main_source("Audio")
        .replace("MODULE_COUNTRY = None", "MODULE_COUNTRY = \"US\"");
    fixture.write_backend("audio", "audio.py", &source);
    let (output, summary) = fixture.modcheck_json("audio", &["--backend"]);
    assert!(output.status.success());
    assert_eq!(summary["backend"]["metadata"]["country"], "US");
}

#[test]
fn event_without_platform_ancestor_is_excluded() {
    let fixture = Fixture::new();
    fixture.install_valid_backend("audio", "Audio");
    fixture.write_backend("audio", "myevent.py", "class Myevent:\n    pass\n");

    let (output, summary) = fixture.modcheck_json("audio", &["--backend"]);
    assert!(!output.status.success());
    let errors = strings_at(&summary, "/backend/errors");
    assert_eq!(errors.len(), 1);
    assert!(errors[0].contains("class \"Myevent\" should inherit from \"Event\""));
    assert!(summary["backend"]["files"]["events"]
        .as_array()
        .expect("events")
        .is_empty());
}

#[test]
fn locally_declared_event_base_is_rejected() {
    let fixture = Fixture::new();
    fixture.install_valid_backend("audio", "Audio");
    fixture.write_backend(
        "audio",
        "fakeevent.py",
        "class Event:\n    pass\n\n\nclass FakeEvent(Event):\n    pass\n",
    );

    let (_, summary) = fixture.modcheck_json("audio", &["--backend"]);
    let errors = strings_at(&summary, "/backend/errors");
    assert_eq!(errors.len(), 1);
    assert!(errors[0].contains("(cleep.libs.internals.event.Event)"));
}

#[test]
fn event_through_intermediate_base_is_accepted() {
    let fixture = Fixture::new();
    fixture.install_valid_backend("audio", "Audio");
    fixture.write_backend(
        "audio",
        "base.py",
        "from cleep.libs.internals.event import Event\n\nclass AudioBase(Event):\n    pass\n",
    );
    fixture.write_backend(
        "audio",
        "volumeevent.py",
        "from .base import AudioBase\n\nclass VolumeEvent(AudioBase):\n    EVENT_NAME = 'audio.volume.update'\n",
    );

    let (output, summary) = fixture.modcheck_json("audio", &["--backend"]);
    assert!(output.status.success(), "stdout: {}", String::from_utf8_lossy(&output.stdout));
    assert_eq!(summary["backend"]["files"]["events"][0]["classname"], "VolumeEvent");
    assert_eq!(summary["backend"]["files"]["libs"][0]["path"], "audio/base.py");
}

#[test]
fn syntax_error_in_role_file_does_not_stop_classification() {
    let fixture = Fixture::new();
    fixture.install_valid_backend("audio", "Audio");
    fixture.write_backend(
        "audio",
        "brokenevent.py",
        "from cleep.libs.internals.event import Event\n\nclass BrokenEvent(Event:\n    pass\n",
    );
    fixture.write_backend("audio", "audioplayevent.py", PLAY_EVENT);

    let (_, summary) = fixture.modcheck_json("audio", &["--backend"]);
    let errors = strings_at(&summary, "/backend/errors");
    assert_eq!(errors.len(), 1);
    assert!(errors[0].starts_with("Error loading file \""));
    assert!(errors[0].contains("brokenevent.py\". Please check file ["));
    let events = summary["backend"]["files"]["events"].as_array().expect("events");
    assert_eq!(events.len(), 1);
    assert_eq!(events[0]["classname"], "AudioPlayEvent");
}

#[test]
fn missing_init_in_sub_folder_is_one_aggregate_error() {
    let fixture = Fixture::new();
    fixture.install_valid_backend("audio", "Audio");
    fixture.write_backend("audio", "libs/helper.py", "VALUE = 1\n");
    fixture.write_backend("audio", "libs/codecs/mp3.py", "VALUE = 2\n");

    let (_, summary) = fixture.modcheck_json("audio", &["--backend"]);
    assert_eq!(
        strings_at(&summary, "/backend/errors"),
        vec![
            "Some __init__.py files are missing in root folder or sub folders (audio/libs, audio/libs/codecs)"
                .to_string()
        ]
    );
}

#[test]
fn missing_module_is_fatal() {
    let fixture = Fixture::new();
    let output = fixture.run(&["modcheck", "--module", "ghost", "--backend"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Module \"ghost\" does not exist"), "stderr: {stderr}");
    assert!(output.stdout.is_empty());
}

#[test]
fn main_class_must_match_module_name() {
    let fixture = Fixture::new();
    fixture.install_valid_backend("audio", "SoundPlayer");
    let output = fixture.run(&["modcheck", "--module", "audio", "--backend"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Main class was not found for app \"audio\""), "stderr: {stderr}");
}

#[test]
fn unparsable_main_file_is_fatal() {
    let fixture = Fixture::new();
    fixture.write_backend("audio", "__init__.py", "");
    fixture.write_backend("audio", "audio.py", "class Audio(CleepModule:\n    pass\n");
    let output = fixture.run(&["modcheck", "--module", "audio", "--backend"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("Unable to load application \"audio\". Please check your code"),
        "stderr: {stderr}"
    );
}

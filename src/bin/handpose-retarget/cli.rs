use clap::{Parser, ValueEnum};
use handpose_retarget::retarget_config::RigMode;

const CONFIG_FILE_PATH: &str = "./retarget.json";
const RECORDING_FILE_PATH: &str = "./recording.json";

#[derive(ValueEnum, Debug, Clone, Copy)]
pub enum RigArg {
    /// One independent shape per landmark
    Shapes,
    /// Generated hand skeleton with named bones
    Named,
}

impl From<RigArg> for RigMode {
    fn from(arg: RigArg) -> Self {
        match arg {
            RigArg::Shapes => RigMode::IndependentShapes,
            RigArg::Named => RigMode::NamedRig,
        }
    }
}

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Where to load retargeting config
    #[arg(long="retargetConfigPath",default_value_t=String::from(CONFIG_FILE_PATH))]
    pub config_path: String,

    /// Recorded detector output to replay (.json, or .msgpack/.mp)
    #[arg(long="recording",default_value_t=String::from(RECORDING_FILE_PATH))]
    pub recording_path: String,

    /// Interval between render ticks
    #[arg(long = "tickIntervalMs", default_value_t = 16)]
    pub tick_interval_ms: u64,

    /// Interval between replayed detections, i.e. how long one inference "takes"
    #[arg(long = "detectorIntervalMs", default_value_t = 33)]
    pub detector_interval_ms: u64,

    /// Override the rig mode from the config file
    #[arg(long = "rig", value_enum)]
    pub rig: Option<RigArg>,

    /// JSON bone list for a custom named rig; overrides --rig
    #[arg(long = "bonesPath")]
    pub bones_path: Option<String>,

    /// Print every applied tick's joint poses to stdout, one JSON object per line
    #[arg(long = "print")]
    pub print: bool,

    /// Write the effective config back to --retargetConfigPath
    #[arg(long = "writeConfig")]
    pub write_config: bool,

    #[arg(long = "loglevel",default_value_t=String::from("info"))]
    pub log_level: String,
}

use std::path::{Path, PathBuf};

/// Environment variable that prefixes every host path (containers, test rigs)
pub const SYSFS_ROOT_ENV: &str = "ESMI_SYSFS_ROOT";

/// hwmon `name` of the accumulating energy counter driver
pub const ENERGY_HWMON_NAME: &str = "amd_energy";

/// Register device node names, in order of preference
pub const MSR_DEVICE_NAMES: [&str; 2] = ["msr_safe", "msr"];

/// Where the kernel interfaces live on this host
#[derive(Debug, Clone)]
pub struct HostConfig {
    pub cpuinfo: PathBuf,
    pub hsmp_device: PathBuf,
    pub cpu_dev_root: PathBuf,
    pub msr_device_name: Option<String>,
    pub hwmon_root: PathBuf,
    pub energy_hwmon: Option<PathBuf>,
    pub hsmp_sysfs_root: PathBuf,
}

impl HostConfig {
    /// Standard Linux locations under `root`, without probing anything
    pub fn with_root(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        Self {
            cpuinfo: root.join("proc/cpuinfo"),
            hsmp_device: root.join("dev/hsmp"),
            cpu_dev_root: root.join("dev/cpu"),
            msr_device_name: None,
            hwmon_root: root.join("sys/class/hwmon"),
            energy_hwmon: None,
            hsmp_sysfs_root: root.join("sys/devices/platform/amd_hsmp"),
        }
    }

    /// Locate the energy and register drivers on the running host
    pub fn auto_detect() -> Self {
        let root = std::env::var(SYSFS_ROOT_ENV).unwrap_or_else(|_| "/".to_string());
        let mut config = Self::with_root(&root);

        config.energy_hwmon = Self::detect_energy_hwmon(&config.hwmon_root);
        config.msr_device_name = Self::detect_msr_device(&config.cpu_dev_root);

        tracing::info!(
            "Host drivers: energy hwmon {:?}, register device {:?}, hsmp {}",
            config.energy_hwmon,
            config.msr_device_name,
            if config.hsmp_device.exists() {
                "present"
            } else {
                "absent"
            }
        );

        config
    }

    /// Find the hwmon directory whose `name` is the energy driver
    pub fn detect_energy_hwmon(hwmon_root: &Path) -> Option<PathBuf> {
        let entries = std::fs::read_dir(hwmon_root).ok()?;

        for entry in entries.filter_map(|e| e.ok()) {
            let dir = entry.path();
            if let Ok(name) = std::fs::read_to_string(dir.join("name")) {
                if name.trim() == ENERGY_HWMON_NAME {
                    tracing::debug!("Found {} at {}", ENERGY_HWMON_NAME, dir.display());
                    return Some(dir);
                }
            }
        }

        tracing::debug!("No {} hwmon under {}", ENERGY_HWMON_NAME, hwmon_root.display());
        None
    }

    /// Pick the first register device node that exists for CPU 0
    pub fn detect_msr_device(cpu_dev_root: &Path) -> Option<String> {
        MSR_DEVICE_NAMES
            .iter()
            .find(|name| cpu_dev_root.join("0").join(name).exists())
            .map(|name| name.to_string())
    }

    pub fn msr_device(&self, cpu: u32) -> Option<PathBuf> {
        self.msr_device_name
            .as_ref()
            .map(|name| self.cpu_dev_root.join(cpu.to_string()).join(name))
    }

    pub fn energy_counter(&self, index: u32) -> Option<PathBuf> {
        self.energy_hwmon
            .as_ref()
            .map(|dir| dir.join(format!("energy{index}_input")))
    }

    pub fn metrics_table(&self, socket: u32) -> PathBuf {
        self.hsmp_sysfs_root
            .join(format!("socket{socket}"))
            .join("metrics_bin")
    }
}

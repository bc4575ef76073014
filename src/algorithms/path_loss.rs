/// 路径损耗模型 - RSSI 到距离转换
///
/// 三种可互换的模型，统一由 `PathLossModel::distance` 分派：
/// - 自由空间 (FreeSpace)
/// - ITU 室内模型 (ItuIndoor)
/// - 对数距离 + 穿墙损耗 (LogDistanceWall)

use crate::error::{EstimationError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// 距离显示单位（内部计算统一使用米）
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistanceUnit {
    /// 米
    #[default]
    Meter,
    /// 厘米
    Centimeter,
    /// 毫米
    Millimeter,
}

impl DistanceUnit {
    /// 将米转换为当前单位
    pub fn convert_meters(&self, meters: f64) -> f64 {
        match self {
            DistanceUnit::Meter => meters,
            DistanceUnit::Centimeter => meters * 100.0,
            DistanceUnit::Millimeter => meters * 1000.0,
        }
    }

    /// 单位符号
    pub fn symbol(&self) -> &'static str {
        match self {
            DistanceUnit::Meter => "m",
            DistanceUnit::Centimeter => "cm",
            DistanceUnit::Millimeter => "mm",
        }
    }
}

/// 路径损耗模型（参数随变体携带，配置后不再修改）
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PathLossModel {
    /// 自由空间模型
    ///
    /// 公式: d = 10^((P_1m - RSSI - 20*log10(f) + 27.55) / 20)
    FreeSpace {
        /// 1 米处的发射参考功率 (dBm)
        tx_power_at_1m: f64,
    },
    /// ITU 室内传播模型
    ///
    /// 公式: d = 10^((L + 28 - 20*log10(f) - Lf) / n)，其中 L = -RSSI
    ItuIndoor {
        /// 距离功率损耗系数
        n: f64,
        /// 楼层穿透损耗 (dB)
        floor_loss: f64,
    },
    /// 对数距离模型 + 穿墙损耗
    ///
    /// 公式: d = 10^(((A - RSSI) - walls * Lw) / (10 * gamma))
    LogDistanceWall {
        /// 1 米处的 RSSI (dBm)
        rssi_at_1m: f64,
        /// 路径损耗指数
        gamma: f64,
        /// 每面墙的损耗 (dB)
        wall_loss_per_wall: f64,
    },
}

impl PathLossModel {
    /// 创建自由空间模型
    pub fn free_space(tx_power_at_1m: f64) -> Self {
        PathLossModel::FreeSpace { tx_power_at_1m }
    }

    /// 创建 ITU 室内模型
    pub fn itu_indoor(n: f64, floor_loss: f64) -> Self {
        PathLossModel::ItuIndoor { n, floor_loss }
    }

    /// 创建对数距离穿墙模型
    pub fn log_distance_wall(rssi_at_1m: f64, gamma: f64, wall_loss_per_wall: f64) -> Self {
        PathLossModel::LogDistanceWall {
            rssi_at_1m,
            gamma,
            wall_loss_per_wall,
        }
    }

    /// 模型名称
    pub fn model_type(&self) -> &'static str {
        match self {
            PathLossModel::FreeSpace { .. } => "free_space",
            PathLossModel::ItuIndoor { .. } => "itu_indoor",
            PathLossModel::LogDistanceWall { .. } => "log_distance_wall",
        }
    }

    /// 根据 RSSI 计算原始距离（米）
    ///
    /// 不对结果做截断；频率非正或结果非有限值时返回错误。
    pub fn distance(&self, rssi: i16, frequency_mhz: i32, walls: u32) -> Result<f64> {
        self.distance_f64(rssi as f64, frequency_mhz, walls)
    }

    /// 根据任意（例如平滑后的）RSSI 值计算距离
    pub fn distance_f64(&self, rssi_f64: f64, frequency_mhz: i32, walls: u32) -> Result<f64> {
        let exponent = match *self {
            PathLossModel::FreeSpace { tx_power_at_1m } => {
                let freq_term = 20.0 * frequency_log10(frequency_mhz)?;
                (tx_power_at_1m - rssi_f64 - freq_term + 27.55) / 20.0
            }
            PathLossModel::ItuIndoor { n, floor_loss } => {
                let freq_term = 20.0 * frequency_log10(frequency_mhz)?;
                let path_loss = -rssi_f64;
                (path_loss + 28.0 - freq_term - floor_loss) / n
            }
            PathLossModel::LogDistanceWall {
                rssi_at_1m,
                gamma,
                wall_loss_per_wall,
            } => {
                let loss = (rssi_at_1m - rssi_f64) - walls as f64 * wall_loss_per_wall;
                loss / (10.0 * gamma)
            }
        };

        let distance = 10_f64.powf(exponent);
        if !distance.is_finite() {
            return Err(EstimationError::NonFiniteDistance { rssi: rssi_f64 });
        }
        Ok(distance)
    }

    /// 根据距离（米）反算期望 RSSI
    pub fn expected_rssi(&self, distance: f64, frequency_mhz: i32, walls: u32) -> Result<f64> {
        if distance <= 0.0 || !distance.is_finite() {
            return Err(EstimationError::NonPositiveDistance(distance));
        }
        let log_d = distance.log10();
        let rssi = match *self {
            PathLossModel::FreeSpace { tx_power_at_1m } => {
                tx_power_at_1m - 20.0 * log_d - 20.0 * frequency_log10(frequency_mhz)? + 27.55
            }
            PathLossModel::ItuIndoor { n, floor_loss } => {
                let path_loss = n * log_d - 28.0 + 20.0 * frequency_log10(frequency_mhz)? + floor_loss;
                -path_loss
            }
            PathLossModel::LogDistanceWall {
                rssi_at_1m,
                gamma,
                wall_loss_per_wall,
            } => rssi_at_1m - walls as f64 * wall_loss_per_wall - 10.0 * gamma * log_d,
        };
        Ok(rssi)
    }

    /// 验证模型参数的合理性
    pub fn validate(&self) -> Result<()> {
        match *self {
            PathLossModel::FreeSpace { tx_power_at_1m } => {
                if !tx_power_at_1m.is_finite() {
                    return Err(invalid("参考功率必须为有限值"));
                }
            }
            PathLossModel::ItuIndoor { n, floor_loss } => {
                if !(n > 0.0 && n.is_finite()) {
                    return Err(invalid("ITU 损耗系数 n 必须为正"));
                }
                if !floor_loss.is_finite() {
                    return Err(invalid("楼层损耗必须为有限值"));
                }
            }
            PathLossModel::LogDistanceWall {
                rssi_at_1m,
                gamma,
                wall_loss_per_wall,
            } => {
                if !(gamma > 0.0 && gamma.is_finite()) {
                    return Err(invalid("路径损耗指数 gamma 必须为正"));
                }
                if !rssi_at_1m.is_finite() || !wall_loss_per_wall.is_finite() {
                    return Err(invalid("参考 RSSI 与穿墙损耗必须为有限值"));
                }
            }
        }
        Ok(())
    }

    /// 获取模型描述
    pub fn description(&self) -> String {
        match self {
            PathLossModel::FreeSpace { tx_power_at_1m } => {
                format!("路径损耗模型 [free_space] - P1m={:.2} dBm", tx_power_at_1m)
            }
            PathLossModel::ItuIndoor { n, floor_loss } => {
                format!("路径损耗模型 [itu_indoor] - n={:.2}, Lf={:.2} dB", n, floor_loss)
            }
            PathLossModel::LogDistanceWall {
                rssi_at_1m,
                gamma,
                wall_loss_per_wall,
            } => format!(
                "路径损耗模型 [log_distance_wall] - A={:.2} dBm, gamma={:.2}, Lw={:.2} dB",
                rssi_at_1m, gamma, wall_loss_per_wall
            ),
        }
    }
}

impl Default for PathLossModel {
    fn default() -> Self {
        // 常见 BLE 室内参数
        PathLossModel::log_distance_wall(-40.0, 3.0, 3.0)
    }
}

impl fmt::Display for PathLossModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description())
    }
}

fn frequency_log10(frequency_mhz: i32) -> Result<f64> {
    if frequency_mhz <= 0 {
        return Err(EstimationError::NonPositiveFrequency(frequency_mhz));
    }
    Ok((frequency_mhz as f64).log10())
}

fn invalid(msg: &str) -> EstimationError {
    EstimationError::InvalidConfig(msg.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_distance_wall_reference() {
        let model = PathLossModel::log_distance_wall(-40.0, 3.0, 3.0);
        let d0 = model.distance(-60, 2412, 0).unwrap();
        let d1 = model.distance(-60, 2412, 1).unwrap();
        assert!((d0 - 10_f64.powf(20.0 / 30.0)).abs() < 1e-12);
        assert!((d0 - 4.64).abs() < 0.01);
        assert!((d1 - 10_f64.powf(17.0 / 30.0)).abs() < 1e-12);
    }

    #[test]
    fn test_walls_decrease_distance() {
        let model = PathLossModel::log_distance_wall(-40.0, 3.0, 3.0);
        let mut previous = f64::INFINITY;
        for walls in 0..6 {
            let d = model.distance(-60, 2412, walls).unwrap();
            assert!(d < previous, "walls={} 距离未减小", walls);
            previous = d;
        }
    }

    #[test]
    fn test_free_space_formula() {
        let model = PathLossModel::free_space(0.0);
        let d = model.distance(-60, 2400, 0).unwrap();
        let expected = 10_f64.powf((0.0 + 60.0 - 20.0 * 2400_f64.log10() + 27.55) / 20.0);
        assert_eq!(d, expected);
    }

    #[test]
    fn test_itu_indoor_formula() {
        let model = PathLossModel::itu_indoor(30.0, 0.0);
        let d = model.distance(-70, 2400, 0).unwrap();
        let expected = 10_f64.powf((70.0 + 28.0 - 20.0 * 2400_f64.log10()) / 30.0);
        assert_eq!(d, expected);
    }

    #[test]
    fn test_non_positive_frequency_rejected() {
        for model in [PathLossModel::free_space(0.0), PathLossModel::itu_indoor(30.0, 0.0)] {
            for freq in [0, -2400] {
                match model.distance(-60, freq, 0) {
                    Err(EstimationError::NonPositiveFrequency(f)) => assert_eq!(f, freq),
                    other => panic!("期望频率错误，实际: {:?}", other),
                }
            }
        }
        // 对数距离模型不使用频率
        assert!(PathLossModel::default().distance(-60, 0, 0).is_ok());
    }

    #[test]
    fn test_non_finite_distance_rejected() {
        let model = PathLossModel::log_distance_wall(-40.0, 1e-300, 3.0);
        assert!(matches!(
            model.distance(-90, 2412, 0),
            Err(EstimationError::NonFiniteDistance { .. })
        ));
    }

    #[test]
    fn test_expected_rssi_inverts_distance() {
        let model = PathLossModel::itu_indoor(28.0, 5.0);
        let d = model.distance(-65, 2437, 0).unwrap();
        let rssi = model.expected_rssi(d, 2437, 0).unwrap();
        assert!((rssi - (-65.0)).abs() < 1e-9);
        assert!(model.expected_rssi(0.0, 2437, 0).is_err());
    }

    #[test]
    fn test_validate() {
        assert!(PathLossModel::default().validate().is_ok());
        assert!(PathLossModel::itu_indoor(0.0, 0.0).validate().is_err());
        assert!(PathLossModel::log_distance_wall(-40.0, -1.0, 3.0).validate().is_err());
    }

    #[test]
    fn test_serde_tagged() {
        let json = r#"{"type":"log_distance_wall","rssi_at_1m":-40.0,"gamma":3.0,"wall_loss_per_wall":3.0}"#;
        let model: PathLossModel = serde_json::from_str(json).unwrap();
        assert_eq!(model, PathLossModel::log_distance_wall(-40.0, 3.0, 3.0));
    }

    #[test]
    fn test_unit_conversion() {
        assert_eq!(DistanceUnit::Centimeter.convert_meters(1.5), 150.0);
        assert_eq!(DistanceUnit::Millimeter.convert_meters(1.0), 1000.0);
        assert_eq!(DistanceUnit::Meter.symbol(), "m");
    }
}

//! 设备壁纸预设。
//!
//! iPhone 官方分辨率按“高 x 宽”标注，这里统一为竖版 `w < h`。

/// 单个设备预设。
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct DevicePreset {
    pub group: &'static str,
    pub name: &'static str,
    pub w: u32,
    pub h: u32,
}

const fn preset(group: &'static str, name: &'static str, w: u32, h: u32) -> DevicePreset {
    DevicePreset { group, name, w, h }
}

pub static PRESETS: &[DevicePreset] = &[
    preset("iPhone", "iPhone 12 mini / 13 mini", 1080, 2340),
    preset("iPhone", "iPhone 12 / 12 Pro / 13 / 13 Pro / 14", 1170, 2532),
    preset("iPhone", "iPhone 14 Pro / 15 / 15 Pro / 16 / 16e", 1179, 2556),
    preset("iPhone", "iPhone 12 Pro Max / 13 Pro Max / 14 Plus", 1284, 2778),
    preset("iPhone", "iPhone 14 Pro Max / 15 Plus / 15 Pro Max / 16 Plus", 1290, 2796),
    preset("iPhone", "iPhone 16 Pro / 17 / 17 Pro", 1206, 2622),
    preset("iPhone", "iPhone 16 Pro Max / 17 Pro Max", 1320, 2868),
    preset("MacBook", "MacBook Air 13.6 (M2/M3/M4) 2560×1664", 2560, 1664),
    preset("MacBook", "MacBook Air 15.3 (M2/M3/M4) 2880×1864", 2880, 1864),
    preset("MacBook", "MacBook Pro 14.2 3024×1964", 3024, 1964),
    preset("MacBook", "MacBook Pro 16.2 3456×2234", 3456, 2234),
];

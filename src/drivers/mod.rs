// src/drivers/mod.rs
// 设备通讯与绘图相关的子模块
pub mod error;
pub mod plot;
pub mod protocol;
pub mod serial;
pub mod source;

// 公开导出常用类型，方便外部调用
pub use error::DaqError;
pub use plot::{render_waveform_png, PlotStyle};
pub use protocol::{parse_line, DeviceCommand, ParsedLine, ProtocolError};
pub use serial::{list_ports, SerialSession};
pub use source::{DeviceLink, SimulatedDevice};

#[cfg(test)]
pub use source::ManualLink;

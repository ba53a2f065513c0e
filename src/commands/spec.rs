//! Device specification command

use epp2_core::{DeviceCode, DeviceSpec};

/// Print the fields packed into a device code
pub fn run(code: DeviceCode) {
    println!();
    for line in format_spec(code) {
        println!("{}", line);
    }
    println!();
}

fn format_spec(code: DeviceCode) -> Vec<String> {
    let spec = DeviceSpec::decode(code);
    vec![
        format!("DEVICE CODE   : {}", code),
        format!("EPROM Size    : {}", spec.size),
        format!("Pin Config    : {}", spec.pin_config),
        format!("FF Skip       : {}", if spec.ff_skip { "Yes" } else { "No" }),
        format!("Vpp           : {}", spec.vpp),
        format!("Vcc           : {}", spec.vcc),
        format!("Margin Factor : {}", spec.margin_factor),
        format!("Pulse Time    : {}", spec.pulse_time),
        format!("Algorithm     : {}", spec.algorithm),
    ]
}

//! COM1 sink for the kernel logger.
//!
//! The port is brought up lazily on first write, so log lines emitted
//! before `init()` still reach the wire.

use core::fmt::{self, Write};

use spin::Mutex;
use uart_16550::SerialPort;

const COM1_IO_BASE: u16 = 0x3F8;

static COM1: Mutex<Option<SerialPort>> = Mutex::new(None);

fn with_port(f: impl FnOnce(&mut SerialPort)) {
    let mut guard = COM1.lock();
    let port = guard.get_or_insert_with(|| {
        let mut port = unsafe { SerialPort::new(COM1_IO_BASE) };
        port.init();
        port
    });
    f(port);
}

pub fn init() {
    with_port(|_| {});
}

pub(crate) fn _print(args: fmt::Arguments<'_>) {
    with_port(|port| {
        port.write_fmt(args).ok();
    });
}

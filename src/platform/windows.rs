//! Live raw input on Windows
//!
//! [`WindowsHost`] answers [`InputHost`] queries with the Raw Input API and
//! reads the device catalog from `HKLM\SYSTEM\CurrentControlSet\Enum`.
//! [`MessageWindow`] and [`run_message_loop`] give a console program somewhere
//! to receive `WM_INPUT`.

#![cfg(target_os = "windows")]

use crate::rawinput::{
    fill_sized, CatalogEntry, CatalogError, CatalogKey, DeviceClass, DeviceHandle, HostError,
    InputHost, RawDeviceEntry,
};
use std::ffi::c_void;
use std::mem::size_of;
use std::ptr::{null, null_mut};
use windows_sys::Win32::Foundation::{GetLastError, ERROR_SUCCESS, HANDLE, HWND};
use windows_sys::Win32::System::LibraryLoader::GetModuleHandleW;
use windows_sys::Win32::System::Registry::{RegGetValueW, HKEY_LOCAL_MACHINE, RRF_RT_REG_SZ};
use windows_sys::Win32::System::Threading::GetCurrentThreadId;
use windows_sys::Win32::UI::Input::{
    GetRawInputData, GetRawInputDeviceInfoW, GetRawInputDeviceList, RegisterRawInputDevices,
    RAWINPUTDEVICE, RAWINPUTDEVICELIST, RAWINPUTHEADER, RIDEV_INPUTSINK, RIDI_DEVICENAME,
    RID_INPUT,
};
use windows_sys::Win32::UI::WindowsAndMessaging::{
    CreateWindowExW, DestroyWindow, DispatchMessageW, GetMessageW, PostThreadMessageW,
    TranslateMessage, HWND_MESSAGE, MSG, WM_INPUT, WM_QUIT,
};

const HID_USAGE_PAGE_GENERIC: u16 = 0x01;
const HID_USAGE_GENERIC_KEYBOARD: u16 = 0x06;

const ENUM_ROOT: &str = r"SYSTEM\CurrentControlSet\Enum";

/// Same layout as `RAWINPUTDEVICELIST`, with a `Default` for buffer filling
#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
struct DeviceListRow {
    handle: usize,
    kind: u32,
}

const _: () = assert!(size_of::<DeviceListRow>() == size_of::<RAWINPUTDEVICELIST>());

fn os_error(call: &'static str) -> HostError {
    let code = unsafe { GetLastError() };
    HostError::Os {
        call,
        code: code as i32,
    }
}

fn wide(s: &str) -> Vec<u16> {
    s.encode_utf16().chain(std::iter::once(0)).collect()
}

fn from_wide(chars: &[u16]) -> String {
    let end = chars.iter().position(|&c| c == 0).unwrap_or(chars.len());
    String::from_utf16_lossy(&chars[..end])
}

fn raw_handle(handle: DeviceHandle) -> HANDLE {
    handle.0 as usize as HANDLE
}

/// Read a `REG_SZ` value below `HKEY_LOCAL_MACHINE`
fn read_registry_string(subkey: &str, value: &str) -> Result<String, HostError> {
    let subkey_w = wide(subkey);
    let value_w = wide(value);

    let chars = fill_sized("RegGetValueW", |buf: Option<&mut [u16]>| {
        let capacity = buf.as_ref().map(|b| b.len());
        let (data, mut bytes) = match buf {
            None => (null_mut::<c_void>(), 0u32),
            Some(out) => (out.as_mut_ptr().cast::<c_void>(), (out.len() * 2) as u32),
        };
        let status = unsafe {
            RegGetValueW(
                HKEY_LOCAL_MACHINE,
                subkey_w.as_ptr(),
                value_w.as_ptr(),
                RRF_RT_REG_SZ,
                null_mut(),
                data,
                &mut bytes,
            )
        };
        if status != ERROR_SUCCESS {
            return Err(HostError::Os {
                call: "RegGetValueW",
                code: status as i32,
            });
        }
        // The size step may over-estimate; a successful fill is NUL-terminated
        // and therefore complete.
        Ok(capacity.unwrap_or((bytes as usize).div_ceil(2)))
    })?;

    Ok(from_wide(&chars))
}

/// [`InputHost`] backed by the Raw Input API
#[derive(Debug, Clone, Copy, Default)]
pub struct WindowsHost;

impl InputHost for WindowsHost {
    /// `LPARAM` of a `WM_INPUT` message
    type Message = isize;
    type Target = HWND;

    fn device_list(&self) -> Result<Vec<RawDeviceEntry>, HostError> {
        let row_size = size_of::<RAWINPUTDEVICELIST>() as u32;
        let rows = fill_sized("GetRawInputDeviceList", |buf: Option<&mut [DeviceListRow]>| {
            let (list, mut count) = match buf {
                None => (null_mut::<RAWINPUTDEVICELIST>(), 0u32),
                Some(out) => (out.as_mut_ptr().cast::<RAWINPUTDEVICELIST>(), out.len() as u32),
            };
            let result = unsafe { GetRawInputDeviceList(list, &mut count, row_size) };
            if result == u32::MAX {
                return Err(os_error("GetRawInputDeviceList"));
            }
            if list.is_null() {
                Ok(count as usize)
            } else {
                Ok(result as usize)
            }
        })?;

        Ok(rows
            .into_iter()
            .map(|row| RawDeviceEntry {
                handle: DeviceHandle(row.handle as u64),
                class: DeviceClass::from_raw(row.kind),
            })
            .collect())
    }

    fn device_name(&self, handle: DeviceHandle) -> Result<String, HostError> {
        let chars = fill_sized("GetRawInputDeviceInfoW", |buf: Option<&mut [u16]>| {
            let capacity = buf.as_ref().map(|b| b.len());
            let (data, mut size) = match buf {
                None => (null_mut::<c_void>(), 0u32),
                Some(out) => (out.as_mut_ptr().cast::<c_void>(), out.len() as u32),
            };
            let result =
                unsafe { GetRawInputDeviceInfoW(raw_handle(handle), RIDI_DEVICENAME, data, &mut size) };
            if result == u32::MAX {
                return Err(os_error("GetRawInputDeviceInfoW"));
            }
            // Some versions count the terminator and some don't; the name is
            // NUL-terminated either way.
            Ok(capacity.unwrap_or(size as usize))
        })?;

        Ok(from_wide(&chars))
    }

    fn catalog_entry(&self, key: &CatalogKey) -> Result<CatalogEntry, CatalogError> {
        let subkey = format!(r"{}\{}", ENUM_ROOT, key.subkey());
        let lookup_failed = |e: HostError| CatalogError::LookupFailed {
            key: key.subkey(),
            reason: e.to_string(),
        };

        let description = read_registry_string(&subkey, "DeviceDesc").map_err(lookup_failed)?;
        let class_id = read_registry_string(&subkey, "ClassGUID").map_err(lookup_failed)?;
        Ok(CatalogEntry::new(description, class_id))
    }

    fn read_packet(&self, lparam: &isize) -> Result<Vec<u8>, HostError> {
        let header_size = size_of::<RAWINPUTHEADER>() as u32;
        fill_sized("GetRawInputData", |buf: Option<&mut [u8]>| {
            let (data, mut size) = match buf {
                None => (null_mut::<c_void>(), 0u32),
                Some(out) => (out.as_mut_ptr().cast::<c_void>(), out.len() as u32),
            };
            let result =
                unsafe { GetRawInputData(*lparam as _, RID_INPUT, data, &mut size, header_size) };
            if result == u32::MAX {
                return Err(os_error("GetRawInputData"));
            }
            if data.is_null() {
                Ok(size as usize)
            } else {
                Ok(result as usize)
            }
        })
    }

    fn delivery_param(&self, lparam: &isize) -> isize {
        *lparam
    }

    fn register_keyboard(&self, target: &HWND) -> Result<(), HostError> {
        let device = RAWINPUTDEVICE {
            usUsagePage: HID_USAGE_PAGE_GENERIC,
            usUsage: HID_USAGE_GENERIC_KEYBOARD,
            dwFlags: RIDEV_INPUTSINK,
            hwndTarget: *target,
        };
        let ok = unsafe {
            RegisterRawInputDevices(&device, 1, size_of::<RAWINPUTDEVICE>() as u32)
        };
        if ok == 0 {
            return Err(os_error("RegisterRawInputDevices"));
        }
        Ok(())
    }
}

/// Hidden message-only window that receives `WM_INPUT`
pub struct MessageWindow {
    hwnd: HWND,
}

impl MessageWindow {
    pub fn create() -> Result<Self, HostError> {
        let class = wide("STATIC");
        let hwnd = unsafe {
            CreateWindowExW(
                0,
                class.as_ptr(),
                null(),
                0,
                0,
                0,
                0,
                0,
                HWND_MESSAGE,
                null_mut(),
                GetModuleHandleW(null()),
                null(),
            )
        };
        if hwnd.is_null() {
            return Err(os_error("CreateWindowExW"));
        }
        Ok(Self { hwnd })
    }

    pub fn hwnd(&self) -> HWND {
        self.hwnd
    }
}

impl Drop for MessageWindow {
    fn drop(&mut self) {
        unsafe {
            DestroyWindow(self.hwnd);
        }
    }
}

/// Pump messages on the current thread until Ctrl-C, calling `on_input` with
/// the `LPARAM` of every `WM_INPUT`
pub fn run_message_loop<F: FnMut(isize)>(mut on_input: F) -> Result<(), HostError> {
    let thread_id = unsafe { GetCurrentThreadId() };
    ctrlc::set_handler(move || unsafe {
        PostThreadMessageW(thread_id, WM_QUIT, 0, 0);
    })
    .map_err(|e| HostError::Unavailable(format!("Cannot install Ctrl-C handler: {}", e)))?;

    let mut msg: MSG = unsafe { std::mem::zeroed() };
    loop {
        let result = unsafe { GetMessageW(&mut msg, null_mut(), 0, 0) };
        match result {
            0 => return Ok(()),
            -1 => return Err(os_error("GetMessageW")),
            _ => {}
        }
        if msg.message == WM_INPUT {
            on_input(msg.lParam);
        }
        unsafe {
            TranslateMessage(&msg);
            DispatchMessageW(&msg);
        }
    }
}

//!
//! Raw CMSIS-RTOS2 Bindings
//!
//! Function and type declarations from `cmsis_os2.h`. Unlike FreeRTOS
//! there is no macro layer; every name below is a real linker symbol in
//! RTX5.
//!

#![allow(non_camel_case_types, non_upper_case_globals, non_snake_case, dead_code)]

use core::ffi::{c_char, c_void};

pub type osThreadId_t = *mut c_void;
pub type osMutexId_t = *mut c_void;
pub type osSemaphoreId_t = *mut c_void;
pub type osThreadFunc_t = unsafe extern "C" fn(*mut c_void);
pub type osPriority_t = i32;
pub type TZ_ModuleId_t = u32;

/// osStatus_t values. Plain constants so an unexpected kernel value can
/// never be an invalid enum discriminant.
pub type osStatus_t = i32;
pub const osOK: osStatus_t = 0;

/// osThreadState_t values.
pub type osThreadState_t = i32;
pub const osThreadInactive: osThreadState_t = 0;
pub const osThreadReady: osThreadState_t = 1;
pub const osThreadRunning: osThreadState_t = 2;
pub const osThreadBlocked: osThreadState_t = 3;
pub const osThreadTerminated: osThreadState_t = 4;

pub const osWaitForever: u32 = 0xffff_ffff;

pub const osThreadDetached: u32 = 0x0000_0000;
pub const osMutexRecursive: u32 = 0x0000_0001;
pub const osMutexPrioInherit: u32 = 0x0000_0002;
pub const osMutexRobust: u32 = 0x0000_0008;

#[repr(C)]
pub struct osThreadAttr_t {
    pub name: *const c_char,
    pub attr_bits: u32,
    pub cb_mem: *mut c_void,
    pub cb_size: u32,
    pub stack_mem: *mut c_void,
    pub stack_size: u32,
    pub priority: osPriority_t,
    pub tz_module: TZ_ModuleId_t,
    pub reserved: u32,
}

#[repr(C)]
pub struct osMutexAttr_t {
    pub name: *const c_char,
    pub attr_bits: u32,
    pub cb_mem: *mut c_void,
    pub cb_size: u32,
}

#[repr(C)]
pub struct osSemaphoreAttr_t {
    pub name: *const c_char,
    pub attr_bits: u32,
    pub cb_mem: *mut c_void,
    pub cb_size: u32,
}

unsafe extern "C" {
    pub fn osKernelLock() -> i32;
    pub fn osKernelRestoreLock(lock: i32) -> i32;
    pub fn osKernelGetTickFreq() -> u32;

    pub fn osThreadNew(
        func: osThreadFunc_t,
        argument: *mut c_void,
        attr: *const osThreadAttr_t,
    ) -> osThreadId_t;
    pub fn osThreadGetState(thread_id: osThreadId_t) -> osThreadState_t;
    pub fn osThreadSuspend(thread_id: osThreadId_t) -> osStatus_t;
    pub fn osThreadResume(thread_id: osThreadId_t) -> osStatus_t;
    pub fn osThreadSetPriority(thread_id: osThreadId_t, priority: osPriority_t) -> osStatus_t;
    pub fn osThreadGetPriority(thread_id: osThreadId_t) -> osPriority_t;
    pub fn osThreadExit() -> !;
    pub fn osDelay(ticks: u32) -> osStatus_t;

    pub fn osSemaphoreNew(
        max_count: u32,
        initial_count: u32,
        attr: *const osSemaphoreAttr_t,
    ) -> osSemaphoreId_t;
    pub fn osSemaphoreAcquire(semaphore_id: osSemaphoreId_t, timeout: u32) -> osStatus_t;
    pub fn osSemaphoreRelease(semaphore_id: osSemaphoreId_t) -> osStatus_t;
    pub fn osSemaphoreDelete(semaphore_id: osSemaphoreId_t) -> osStatus_t;
    pub fn osSemaphoreGetCount(semaphore_id: osSemaphoreId_t) -> u32;

    pub fn osMutexNew(attr: *const osMutexAttr_t) -> osMutexId_t;
    pub fn osMutexAcquire(mutex_id: osMutexId_t, timeout: u32) -> osStatus_t;
    pub fn osMutexRelease(mutex_id: osMutexId_t) -> osStatus_t;
    pub fn osMutexDelete(mutex_id: osMutexId_t) -> osStatus_t;
}

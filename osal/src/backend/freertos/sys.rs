//!
//! Raw FreeRTOS Bindings
//!
//! Declares the linker-level symbols behind the public macro layer:
//! `xSemaphoreCreateBinary`, `xSemaphoreTake` and friends expand to the
//! queue API, so those queue functions are what actually links. The
//! kernel must be built with dynamic allocation enabled
//! (`configSUPPORT_DYNAMIC_ALLOCATION`).
//!

#![allow(non_camel_case_types, non_upper_case_globals, non_snake_case, dead_code)]

use core::ffi::{c_char, c_long, c_ulong, c_void};

pub type BaseType_t = c_long;
pub type UBaseType_t = c_ulong;
pub type TickType_t = u32;
pub type TaskHandle_t = *mut c_void;
pub type QueueHandle_t = *mut c_void;
pub type TaskFunction_t = unsafe extern "C" fn(*mut c_void);

pub const pdPASS: BaseType_t = 1;
pub const pdTRUE: BaseType_t = 1;
pub const portMAX_DELAY: TickType_t = 0xffff_ffff;

/// Queue types used by the semaphore macro layer (queue.h).
pub const queueQUEUE_TYPE_MUTEX: u8 = 1;
pub const queueQUEUE_TYPE_BINARY_SEMAPHORE: u8 = 3;
pub const queueQUEUE_TYPE_RECURSIVE_MUTEX: u8 = 4;
pub const queueSEND_TO_BACK: BaseType_t = 0;

/// eTaskState values (task.h). Kept as plain constants; an out-of-range
/// kernel value must not be undefined behavior on our side.
pub type eTaskState = i32;
pub const eRunning: eTaskState = 0;
pub const eReady: eTaskState = 1;
pub const eBlocked: eTaskState = 2;
pub const eSuspended: eTaskState = 3;
pub const eDeleted: eTaskState = 4;
pub const eInvalid: eTaskState = 5;

unsafe extern "C" {
    pub fn xTaskCreate(
        pxTaskCode: TaskFunction_t,
        pcName: *const c_char,
        usStackDepth: u16,
        pvParameters: *mut c_void,
        uxPriority: UBaseType_t,
        pxCreatedTask: *mut TaskHandle_t,
    ) -> BaseType_t;
    pub fn vTaskDelete(xTask: TaskHandle_t);
    pub fn eTaskGetState(xTask: TaskHandle_t) -> eTaskState;
    pub fn vTaskSuspend(xTask: TaskHandle_t);
    pub fn vTaskResume(xTask: TaskHandle_t);
    pub fn vTaskPrioritySet(xTask: TaskHandle_t, uxNewPriority: UBaseType_t);
    pub fn uxTaskPriorityGet(xTask: TaskHandle_t) -> UBaseType_t;
    pub fn vTaskDelay(xTicksToDelay: TickType_t);

    pub fn xQueueGenericCreate(
        uxQueueLength: UBaseType_t,
        uxItemSize: UBaseType_t,
        ucQueueType: u8,
    ) -> QueueHandle_t;
    pub fn xQueueCreateMutex(ucQueueType: u8) -> QueueHandle_t;
    pub fn xQueueSemaphoreTake(xQueue: QueueHandle_t, xTicksToWait: TickType_t) -> BaseType_t;
    pub fn xQueueGenericSend(
        xQueue: QueueHandle_t,
        pvItemToQueue: *const c_void,
        xTicksToWait: TickType_t,
        xCopyPosition: BaseType_t,
    ) -> BaseType_t;
    pub fn xQueueTakeMutexRecursive(xMutex: QueueHandle_t, xTicksToWait: TickType_t) -> BaseType_t;
    pub fn xQueueGiveMutexRecursive(xMutex: QueueHandle_t) -> BaseType_t;
    pub fn vQueueDelete(xQueue: QueueHandle_t);
    pub fn uxQueueMessagesWaiting(xQueue: QueueHandle_t) -> UBaseType_t;
}

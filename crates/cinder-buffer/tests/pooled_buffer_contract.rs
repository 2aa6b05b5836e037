//! `pooled_buffer_contract` 集成测试：聚焦 `PooledBuffer` 生命周期与接口契约。
//!
//! # 测试总览（Why）
//! - 校验写入、冻结、拆分、扩容等状态转换是否恰好通知回收器一次；
//! - 覆盖越界访问与冻结后写入的错误路径；
//! - 以 `RecordingRecycler` 观察回收事件，验证池与缓冲之间的协作协议。

use std::sync::{Arc, Mutex};

use bytes::BytesMut;
use cinder_buffer::{BufferRecycler, PooledBuffer, ReclaimedBuffer};
use cinder_core::buffer::{ReadableBuffer, WritableBuffer};
use cinder_core::error::codes;
use proptest::prelude::*;

/// 记录每一次 `reclaim` 的容量与是否夺回了底层 `BytesMut`。
#[derive(Default)]
struct RecordingRecycler {
    events: Mutex<Vec<(usize, bool)>>,
}

impl RecordingRecycler {
    fn take_events(&self) -> Vec<(usize, bool)> {
        self.events
            .lock()
            .expect("mutex poisoned")
            .drain(..)
            .collect()
    }
}

impl BufferRecycler for RecordingRecycler {
    fn reclaim(&self, reclaimed: ReclaimedBuffer) {
        let capacity = reclaimed.capacity();
        let had_buffer = reclaimed.into_buffer().is_some();
        self.events
            .lock()
            .expect("mutex poisoned")
            .push((capacity, had_buffer));
    }
}

fn pooled(capacity: usize, recycler: &Arc<RecordingRecycler>) -> PooledBuffer {
    PooledBuffer::new(BytesMut::with_capacity(capacity), recycler.clone())
}

/// 冻结操作应转换为只读视图，释放时触发一次回收并夺回内存。
#[test]
fn freeze_transitions_to_read_only_and_recycles_buffer() {
    let recycler = Arc::new(RecordingRecycler::default());
    let mut buffer = pooled(8, &recycler);
    buffer.put_slice(b"abc").expect("写入示例数据");
    let expected_capacity = buffer.capacity();
    let mut readable = Box::new(buffer).freeze().expect("冻结应成功");
    let mut out = [0u8; 3];
    readable
        .copy_into_slice(&mut out)
        .expect("应能读取冻结后的数据");
    assert_eq!(&out, b"abc");
    drop(readable);
    assert_eq!(recycler.take_events(), vec![(expected_capacity, true)]);
}

/// `write_with` 先暴露上界窗口再按实际产出推进写游标，冻结后仍可正常读取。
#[test]
fn write_with_reports_actual_length_then_freezes() {
    let recycler = Arc::new(RecordingRecycler::default());
    let mut buffer = pooled(4, &recycler);
    buffer.put_u32(2).expect("写入头部");
    let produced = buffer
        .write_with(32, &mut |window| {
            window[..2].copy_from_slice(b"XY");
            Ok(2)
        })
        .expect("write_with 应根据实际产出推进写游标");
    assert_eq!(produced, 2);
    assert_eq!(buffer.written(), 6);

    let mut readable = Box::new(buffer).freeze().expect("freeze 之后应转换为只读");
    assert_eq!(readable.read_u32().expect("读取头部"), 2);
    assert_eq!(readable.chunk(), b"XY");
    drop(readable);
    let events = recycler.take_events();
    assert_eq!(events.len(), 1, "生命周期结束时应触发一次回收");
    assert!(events[0].1, "预期成功夺回底层 BytesMut");
}

/// 拆分出的多个视图共享同一租约，全部释放后才触发回收。
#[test]
fn split_to_preserves_lease_and_defers_recycle_until_all_views_drop() {
    let recycler = Arc::new(RecordingRecycler::default());
    let mut buffer = pooled(16, &recycler);
    buffer.put_slice(b"abcdef").expect("初始写入不应失败");
    let mut head = buffer.split_to(2).expect("拆分前缀应获得新的 ReadableBuffer");
    assert_eq!(head.remaining(), 2);
    head.advance(2).expect("拆分片段应能推进至末尾");
    drop(head);
    assert!(
        recycler.take_events().is_empty(),
        "仍有剩余视图持有租约时不应回收"
    );
    drop(buffer);
    assert_eq!(recycler.take_events().len(), 1, "所有视图释放后应触发一次回收");
}

/// 越界读取与冻结后写入返回约定的错误码。
#[test]
fn read_operations_validate_bounds_and_frozen_state() {
    let recycler = Arc::new(RecordingRecycler::default());
    let mut buffer = pooled(8, &recycler);
    buffer.put_slice(b"rust").expect("写入字符串字节不应失败");
    assert_eq!(
        buffer.split_to(10).err().map(|err| err.code()),
        Some(codes::BUFFER_OUT_OF_RANGE),
        "拆分超出剩余长度应报错"
    );
    buffer.advance(2).expect("前进读指针应成功");
    let mut dst = [0u8; 2];
    buffer.copy_into_slice(&mut dst).expect("读取剩余字节应成功");
    assert_eq!(&dst, b"st");
    assert!(
        buffer.copy_into_slice(&mut [0u8; 1]).is_err(),
        "剩余字节不足时应返回错误"
    );

    let frozen = Box::new(buffer).freeze().expect("冻结");
    let vec = frozen.try_into_vec().expect("转换为 Vec");
    assert!(vec.is_empty());
    assert_eq!(recycler.take_events().len(), 1);
}

/// 扩容后刷新租约记录的容量，回收事件看到最新值。
#[test]
fn reserve_refreshes_capacity_recorded_by_recycler() {
    let recycler = Arc::new(RecordingRecycler::default());
    let mut buffer = pooled(4, &recycler);
    let before = buffer.capacity();
    buffer.reserve(64).expect("扩容请求不应失败");
    let after = buffer.capacity();
    assert!(after > before && after >= 64);
    drop(buffer);
    let events = recycler.take_events();
    assert_eq!(events, vec![(after, true)], "租约记录的容量应刷新为扩容后的值");
}

#[test]
fn reclaimed_buffer_retains_metadata() {
    let capacity = 32;
    let reclaimed = ReclaimedBuffer::new(capacity, Some(BytesMut::with_capacity(capacity)));
    assert_eq!(reclaimed.capacity(), capacity);
    assert!(reclaimed.is_reusable());
    assert!(reclaimed.into_buffer().is_some());
}

proptest! {
    /// 任意切分点拆分后，两个视图拼接仍等于原始内容，且只回收一次。
    #[test]
    fn split_then_concat_is_identity(payload in proptest::collection::vec(any::<u8>(), 0..256), cut in 0usize..256) {
        let recycler = Arc::new(RecordingRecycler::default());
        let mut buffer = pooled(payload.len(), &recycler);
        buffer.put_slice(&payload).expect("写入");
        let mut readable = Box::new(buffer).freeze().expect("冻结");
        let cut = cut.min(payload.len());
        let head = readable.split_to(cut).expect("拆分");
        let mut joined = head.chunk().to_vec();
        joined.extend_from_slice(readable.chunk());
        prop_assert_eq!(&joined, &payload);
        drop(head);
        drop(readable);
        prop_assert_eq!(recycler.take_events().len(), 1);
    }
}

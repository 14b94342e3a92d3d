//! Radio Unit scenarios driven by a manual OTA clock

use common::types::{CyclicPrefix, Eaxc, SubcarrierSpacing};
use common::{SlotPoint, SlotSymbolPoint, TddPattern, TddUlDlConfig};
use interfaces::{EthernetGateway, EthernetReceiver, FrameNotifier, InterfaceError};
use num_complex::Complex32;
use ofh::serdes::ecpri::{EcpriHeader, EcpriMessageType};
use ofh::serdes::ethernet::{EthernetHeader, MacAddress};
use ofh::serdes::uplane::{encode_uplane_message, UplaneMessageView, UplaneSectionHeader, IQ_BYTES_PER_PRB};
use ofh::serdes::{CplaneSectionType1, DataDirection, FilterIndex, RadioHeader};
use ofh::window::TxWindowDurations;
use ofh::{
    create_sector, Controller, FrameKey, OtaSymbolBoundaryNotifierManager, Plane, ResourceGrid, ResourceGridContext,
    ResourceGridReader, RxWindowTimingParameters, SectorConfig, SectorDependencies, TimingManager,
    UplinkRxSymbolContext, UplinkSymbolNotifier,
};
use parking_lot::Mutex;
use ru::{RadioUnit, RuErrorContext, RuErrorNotifier, RuOfh, RuOfhConfig, RuOfhDependencies, RuTimingNotifier};
use std::sync::Arc;
use std::time::Duration;

const NOF_PRB: u16 = 11;
const NOF_SUBC: usize = NOF_PRB as usize * 12;
const NOF_SYMBOLS: u32 = 14;
const SLOT_OFFSET_DU_RU: u32 = 2;
const RU_MAC: MacAddress = MacAddress([0x70, 0xb3, 0xd5, 0xe1, 0x5b, 0x06]);
const DU_MAC: MacAddress = MacAddress([0x80, 0x61, 0x5f, 0x0d, 0xdf, 0xaa]);

type EventLog = Arc<Mutex<Vec<String>>>;

struct EventController {
    name: &'static str,
    events: EventLog,
}

impl Controller for EventController {
    fn start(&self) {
        self.events.lock().push(format!("{} start", self.name));
    }

    fn stop(&self) {
        self.events.lock().push(format!("{} stop", self.name));
    }
}

/// Timing manager whose OTA clock advances only when told to
struct ManualTimingManager {
    controller: EventController,
    manager: OtaSymbolBoundaryNotifierManager,
}

impl ManualTimingManager {
    fn notify(&self, symbol_point: SlotSymbolPoint) {
        self.manager.notify(symbol_point);
    }

    /// Deliver every symbol after `from` up to and including `to`
    fn advance(&self, from: SlotSymbolPoint, to: SlotSymbolPoint) {
        for step in 1..=(to - from) {
            self.manager.notify(from + step);
        }
    }
}

impl TimingManager for ManualTimingManager {
    fn get_controller(&self) -> &dyn Controller {
        &self.controller
    }

    fn get_ota_symbol_boundary_notifier_manager(&self) -> &OtaSymbolBoundaryNotifierManager {
        &self.manager
    }
}

struct RecordingEthernetReceiver {
    name: String,
    events: EventLog,
}

impl EthernetReceiver for RecordingEthernetReceiver {
    fn start(&self, _notifier: Arc<dyn FrameNotifier>) -> Result<(), InterfaceError> {
        self.events.lock().push(format!("{} start", self.name));
        Ok(())
    }

    fn stop(&self) {
        self.events.lock().push(format!("{} stop", self.name));
    }
}

#[derive(Default)]
struct RecordingGateway {
    frames: Mutex<Vec<Vec<u8>>>,
}

impl EthernetGateway for RecordingGateway {
    fn send(&self, frames: &[&[u8]]) -> Result<(), InterfaceError> {
        self.frames.lock().extend(frames.iter().map(|frame| frame.to_vec()));
        Ok(())
    }
}

#[derive(Default)]
struct RecordingScheduler {
    ttis: Mutex<Vec<SlotPoint>>,
    late_dl: Mutex<Vec<RuErrorContext>>,
    late_ul: Mutex<Vec<RuErrorContext>>,
}

impl RuTimingNotifier for RecordingScheduler {
    fn on_tti_boundary(&self, slot: SlotPoint) {
        self.ttis.lock().push(slot);
    }

    fn on_ul_half_slot_boundary(&self, _slot: SlotPoint) {}

    fn on_ul_full_slot_boundary(&self, _slot: SlotPoint) {}
}

impl RuErrorNotifier for RecordingScheduler {
    fn on_late_downlink_message(&self, context: &RuErrorContext) {
        self.late_dl.lock().push(*context);
    }

    fn on_late_uplink_message(&self, context: &RuErrorContext) {
        self.late_ul.lock().push(*context);
    }
}

#[derive(Default)]
struct UplinkRecorder {
    symbols: Mutex<Vec<(UplinkRxSymbolContext, Complex32)>>,
}

impl UplinkSymbolNotifier for UplinkRecorder {
    fn on_new_uplink_symbol(&self, context: &UplinkRxSymbolContext, grid: &dyn ResourceGridReader) {
        let value = grid.get(0, context.symbol as usize, 0);
        self.symbols.lock().push((*context, value));
    }
}

struct Fixture {
    ru: RuOfh,
    timing: Arc<ManualTimingManager>,
    gateway: Arc<RecordingGateway>,
    scheduler: Arc<RecordingScheduler>,
    uplink: Arc<UplinkRecorder>,
    events: EventLog,
}

fn sector_config(sector_id: usize, dl_eaxc: &[u16], ul_eaxc: &[u16]) -> SectorConfig {
    SectorConfig {
        sector_id,
        scs: SubcarrierSpacing::Scs30,
        cp: CyclicPrefix::Normal,
        tdd_config: None,
        dl_eaxc: dl_eaxc.iter().copied().map(Eaxc).collect(),
        ul_eaxc: ul_eaxc.iter().copied().map(Eaxc).collect(),
        nof_prb: NOF_PRB,
        ru_mac: RU_MAC,
        du_mac: DU_MAC,
        vlan_id: Some(6),
        pcp: 7,
        mtu: 9000,
        iq_scaling: 1.0,
        // Three symbols at 30 kHz for both C-Plane directions.
        tx_window: TxWindowDurations {
            t1a_max_cp_dl: Duration::from_micros(300),
            t1a_min_cp_dl: Duration::from_micros(110),
            t1a_max_cp_ul: Duration::from_micros(300),
            t1a_min_cp_ul: Duration::from_micros(110),
            t1a_max_up: Duration::from_micros(200),
            t1a_min_up: Duration::from_micros(50),
        },
        dl_processing_time: Duration::ZERO,
        ul_processing_time: Duration::ZERO,
        rx_window: RxWindowTimingParameters { sym_start: 0, sym_end: 10 },
        max_advance_symbols: None,
        nof_frame_buffers: 512,
    }
}

fn fixture(configs: Vec<SectorConfig>) -> Fixture {
    let events: EventLog = Arc::default();
    let gateway = Arc::new(RecordingGateway::default());
    let scheduler = Arc::new(RecordingScheduler::default());
    let uplink = Arc::new(UplinkRecorder::default());
    let timing = Arc::new(ManualTimingManager {
        controller: EventController {
            name: "timing",
            events: events.clone(),
        },
        manager: OtaSymbolBoundaryNotifierManager::new(),
    });

    let sectors = configs
        .into_iter()
        .map(|config| {
            let name = format!("sector{}", config.sector_id);
            create_sector(
                config,
                SectorDependencies {
                    gateway: gateway.clone(),
                    ethernet_receiver: Some(Arc::new(RecordingEthernetReceiver {
                        name,
                        events: events.clone(),
                    })),
                    uplink_notifier: uplink.clone(),
                },
            )
            .unwrap()
        })
        .collect();

    let ru = RuOfh::new(
        RuOfhConfig {
            nof_slot_offset_du_ru: SLOT_OFFSET_DU_RU,
            nof_symbols_per_slot: NOF_SYMBOLS,
        },
        RuOfhDependencies {
            timing_notifier: scheduler.clone(),
            error_notifier: scheduler.clone(),
            sectors,
            timing_manager: timing.clone(),
        },
    );

    Fixture {
        ru,
        timing,
        gateway,
        scheduler,
        uplink,
        events,
    }
}

fn single_sector() -> Fixture {
    fixture(vec![sector_config(0, &[0], &[4])])
}

fn grid(value: f32) -> ResourceGrid {
    let mut grid = ResourceGrid::new(1, NOF_SYMBOLS as usize, NOF_SUBC);
    for symbol in 0..NOF_SYMBOLS as usize {
        grid.fill_symbol(0, symbol, Complex32::new(value, -value));
    }
    grid
}

fn ota(slot: SlotPoint, symbol: u32) -> SlotSymbolPoint {
    SlotSymbolPoint::new(slot, symbol, NOF_SYMBOLS)
}

fn control_key(eaxc: u16, direction: DataDirection) -> FrameKey {
    FrameKey::new(Eaxc(eaxc), direction, Plane::Control)
}

fn user_key(eaxc: u16) -> FrameKey {
    FrameKey::new(Eaxc(eaxc), DataDirection::Downlink, Plane::User)
}

fn decode_cplane(frame: &[u8]) -> (EcpriHeader, CplaneSectionType1) {
    let (_, payload) = EthernetHeader::decode(frame).unwrap();
    let (ecpri, body) = EcpriHeader::decode(payload).unwrap();
    (ecpri, CplaneSectionType1::decode(body).unwrap())
}

fn decode_uplane(frame: &[u8]) -> (EcpriHeader, RadioHeader, Complex32) {
    let (_, payload) = EthernetHeader::decode(frame).unwrap();
    let (ecpri, body) = EcpriHeader::decode(payload).unwrap();
    let message = UplaneMessageView::decode(body).unwrap();
    let mut first = [Complex32::new(0.0, 0.0)];
    message.read_iq(&mut first, 1.0);
    (ecpri, message.radio_header, first[0])
}

fn uplink_frame(eaxc: u16, slot: SlotPoint, symbol: u32, value: f32) -> Vec<u8> {
    let mut frame = Vec::new();
    EthernetHeader::ecpri(DU_MAC, RU_MAC, Some(6), 7).encode(&mut frame);
    EcpriHeader {
        message_type: EcpriMessageType::IqData,
        payload_size: (4 + 8 + NOF_PRB as usize * IQ_BYTES_PER_PRB) as u16,
        eaxc: Eaxc(eaxc),
        seq_id: 0,
    }
    .encode(&mut frame);
    encode_uplane_message(
        &mut frame,
        &RadioHeader::new(DataDirection::Uplink, FilterIndex::StandardChannelFilter, slot, symbol),
        &UplaneSectionHeader {
            section_id: 0,
            start_prb: 0,
            nof_prb: NOF_PRB,
        },
        &vec![Complex32::new(value, 0.0); NOF_SUBC],
        1.0,
    );
    frame
}

#[test]
fn test_slot_two_slots_ahead_is_admitted() {
    let fx = single_sector();
    let slot = SlotPoint::new(1, 10, 8);
    fx.timing.notify(ota(slot - 2, 0));

    fx.ru
        .get_downlink_plane_handler()
        .handle_dl_data(&ResourceGridContext { slot, sector: 0 }, &grid(0.5));

    let pool = fx.ru.sector(0).unwrap().get_transmitter().dl_frame_pool();
    assert_eq!(
        pool.entry_keys(slot),
        vec![control_key(0, DataDirection::Downlink), user_key(0)]
    );

    let cplane = pool.frames(slot, control_key(0, DataDirection::Downlink));
    assert_eq!(cplane.len(), 1);
    let (ecpri, section) = decode_cplane(&cplane[0]);
    assert_eq!(ecpri.message_type, EcpriMessageType::RealTimeControl);
    assert_eq!(section.radio_header.direction, DataDirection::Downlink);
    assert_eq!(section.radio_header.start_symbol, 0);
    assert_eq!(section.nof_symbols, 14);
    assert_eq!(section.nof_prb, NOF_PRB);

    let uplane = pool.frames(slot, user_key(0));
    let symbols: Vec<u8> = uplane.iter().map(|frame| decode_uplane(frame).1.start_symbol).collect();
    assert_eq!(symbols, (0..14).collect::<Vec<u8>>());

    assert!(fx.scheduler.late_dl.lock().is_empty());
}

#[test]
fn test_slot_behind_ota_is_dropped() {
    let fx = single_sector();
    let slot = SlotPoint::new(1, 10, 8);
    fx.timing.notify(ota(slot + 1, 0));

    fx.ru
        .get_downlink_plane_handler()
        .handle_dl_data(&ResourceGridContext { slot, sector: 0 }, &grid(0.5));

    let transmitter = fx.ru.sector(0).unwrap().get_transmitter();
    assert_eq!(transmitter.dl_frame_pool().nof_entries(slot), 0);
    assert_eq!(transmitter.dl_window_checker().nof_late(), 1);
    assert_eq!(*fx.scheduler.late_dl.lock(), vec![RuErrorContext { slot, sector: 0 }]);
}

#[test]
fn test_eaxc_configuration_order() {
    let fx = fixture(vec![sector_config(0, &[0, 1, 2, 3], &[4])]);
    let slot = SlotPoint::new(1, 10, 8);
    fx.timing.notify(ota(slot - 2, 0));

    fx.ru
        .get_downlink_plane_handler()
        .handle_dl_data(&ResourceGridContext { slot, sector: 0 }, &grid(0.5));

    let expected: Vec<FrameKey> = (0..4)
        .flat_map(|eaxc| [control_key(eaxc, DataDirection::Downlink), user_key(eaxc)])
        .collect();
    let pool = fx.ru.sector(0).unwrap().get_transmitter().dl_frame_pool();
    assert_eq!(pool.entry_keys(slot), expected);
}

#[test]
fn test_second_grid_replaces_first() {
    let fx = single_sector();
    let slot = SlotPoint::new(1, 10, 8);
    fx.timing.notify(ota(slot - 2, 0));
    let context = ResourceGridContext { slot, sector: 0 };

    let handler = fx.ru.get_downlink_plane_handler();
    handler.handle_dl_data(&context, &grid(0.5));
    handler.handle_dl_data(&context, &grid(-0.25));

    let pool = fx.ru.sector(0).unwrap().get_transmitter().dl_frame_pool();
    assert_eq!(pool.frames(slot, control_key(0, DataDirection::Downlink)).len(), 1);
    let uplane = pool.frames(slot, user_key(0));
    assert_eq!(uplane.len(), 14);
    for frame in &uplane {
        let (_, _, sample) = decode_uplane(frame);
        assert!((sample.re + 0.25).abs() < 1e-3);
        assert!((sample.im - 0.25).abs() < 1e-3);
    }
}

#[test]
fn test_tdd_restricts_downlink_symbols() {
    let mut config = sector_config(0, &[0], &[4]);
    config.tdd_config = Some(
        TddUlDlConfig::new(
            TddPattern {
                dl_ul_tx_period_nof_slots: 5,
                nof_dl_slots: 3,
                nof_dl_symbols: 6,
                nof_ul_slots: 1,
                nof_ul_symbols: 4,
            },
            None,
            CyclicPrefix::Normal,
        )
        .unwrap(),
    );
    let fx = fixture(vec![config]);

    // Slot 3 of the period is the special slot, slot 4 is uplink only.
    let special = SlotPoint::new(1, 10, 3);
    let uplink = SlotPoint::new(1, 10, 4);
    fx.timing.notify(ota(special - 2, 0));

    let handler = fx.ru.get_downlink_plane_handler();
    handler.handle_dl_data(&ResourceGridContext { slot: special, sector: 0 }, &grid(0.5));
    handler.handle_dl_data(&ResourceGridContext { slot: uplink, sector: 0 }, &grid(0.5));

    let pool = fx.ru.sector(0).unwrap().get_transmitter().dl_frame_pool();
    let (_, section) = decode_cplane(&pool.frames(special, control_key(0, DataDirection::Downlink))[0]);
    assert_eq!(section.nof_symbols, 6);
    let symbols: Vec<u8> = pool
        .frames(special, user_key(0))
        .iter()
        .map(|frame| decode_uplane(frame).1.start_symbol)
        .collect();
    assert_eq!(symbols, (0..6).collect::<Vec<u8>>());
    assert_eq!(pool.nof_entries(uplink), 0);
}

#[test]
fn test_clear_untouched_slot() {
    let fx = single_sector();
    let slot = SlotPoint::new(1, 10, 8);
    let pool = fx.ru.sector(0).unwrap().get_transmitter().dl_frame_pool();

    pool.clear_slot(slot);
    pool.clear_slot(slot);

    assert_eq!(pool.nof_entries(slot), 0);
    assert_eq!(pool.stats().exhausted, 0);
}

#[test]
fn test_grids_dispatched_by_sector() {
    let fx = fixture(vec![sector_config(0, &[0], &[4]), sector_config(1, &[2], &[6])]);
    let slot = SlotPoint::new(1, 10, 8);
    fx.timing.notify(ota(slot - 2, 0));

    let handler = fx.ru.get_downlink_plane_handler();
    handler.handle_dl_data(&ResourceGridContext { slot, sector: 1 }, &grid(0.5));
    // No such sector: ignored.
    handler.handle_dl_data(&ResourceGridContext { slot, sector: 7 }, &grid(0.5));

    let sector0 = fx.ru.sector(0).unwrap().get_transmitter().dl_frame_pool();
    let sector1 = fx.ru.sector(1).unwrap().get_transmitter().dl_frame_pool();
    assert_eq!(sector0.nof_entries(slot), 0);
    assert_eq!(sector1.entry_keys(slot), vec![control_key(2, DataDirection::Downlink), user_key(2)]);
}

#[test]
fn test_sectors_found_by_id_not_position() {
    let fx = fixture(vec![sector_config(3, &[0], &[4]), sector_config(1, &[2], &[6])]);
    let slot = SlotPoint::new(1, 10, 8);
    fx.timing.notify(ota(slot - 2, 0));

    let handler = fx.ru.get_downlink_plane_handler();
    handler.handle_dl_data(&ResourceGridContext { slot, sector: 1 }, &grid(0.5));
    // Position 0 holds sector 3, nothing is configured with id 0.
    handler.handle_dl_data(&ResourceGridContext { slot, sector: 0 }, &grid(0.5));

    let sector3 = fx.ru.sector_by_id(3).unwrap().get_transmitter().dl_frame_pool();
    let sector1 = fx.ru.sector_by_id(1).unwrap().get_transmitter().dl_frame_pool();
    assert_eq!(sector3.nof_entries(slot), 0);
    assert_eq!(sector1.entry_keys(slot), vec![control_key(2, DataDirection::Downlink), user_key(2)]);
    assert!(fx.ru.sector_by_id(0).is_none());

    fx.ru.get_uplink_plane_handler().handle_new_uplink_slot(
        &ResourceGridContext { slot, sector: 3 },
        ResourceGrid::new_shared(1, NOF_SYMBOLS as usize, NOF_SUBC),
    );
    let ul_keys = fx.ru.sector(0).unwrap().get_transmitter().ul_frame_pool().entry_keys(slot);
    assert_eq!(ul_keys, vec![control_key(4, DataDirection::Uplink)]);
}

#[test]
#[should_panic(expected = "Sector 2 configured twice")]
fn test_duplicate_sector_ids_rejected() {
    fixture(vec![sector_config(2, &[0], &[4]), sector_config(2, &[1], &[5])]);
}

#[test]
fn test_controller_order() {
    let fx = fixture(vec![sector_config(0, &[0], &[4]), sector_config(1, &[2], &[6])]);

    fx.ru.get_controller().start();
    fx.ru.get_controller().stop();

    assert_eq!(
        *fx.events.lock(),
        vec![
            "sector0 start",
            "sector1 start",
            "timing start",
            "timing stop",
            "sector0 stop",
            "sector1 stop",
        ]
    );
}

#[test]
fn test_timing_subscription() {
    let fx = fixture(vec![sector_config(0, &[0], &[4]), sector_config(1, &[2], &[6])]);
    // RU timing adapter, then a transmitter and a receiver per sector.
    assert_eq!(fx.timing.get_ota_symbol_boundary_notifier_manager().nof_subscribers(), 5);
    assert_eq!(fx.ru.nof_sectors(), 2);

    let slot = SlotPoint::new(1, 10, 8);
    fx.timing.advance(ota(slot - 1, 13), ota(slot + 1, 0));

    assert_eq!(
        *fx.scheduler.ttis.lock(),
        vec![slot + SLOT_OFFSET_DU_RU as i32, slot + 1 + SLOT_OFFSET_DU_RU as i32]
    );
}

/// Steps the OTA clock one symbol at a time, recording where each frame left
fn record_transmissions(fx: &Fixture, from: SlotSymbolPoint, to: SlotSymbolPoint) -> Vec<(Vec<u8>, SlotSymbolPoint)> {
    let mut sent = Vec::new();
    for step in 1..=(to - from) {
        let before = fx.gateway.frames.lock().len();
        fx.timing.notify(from + step);
        let frames = fx.gateway.frames.lock();
        sent.extend(frames[before..].iter().map(|frame| (frame.clone(), from + step)));
    }
    sent
}

#[test]
fn test_downlink_frames_sent_at_transmission_point() {
    let fx = single_sector();
    let slot = SlotPoint::new(1, 10, 8);
    let start = ota(slot - 2, 0);
    fx.timing.notify(start);

    fx.ru
        .get_downlink_plane_handler()
        .handle_dl_data(&ResourceGridContext { slot, sector: 0 }, &grid(0.5));

    let sent = record_transmissions(&fx, start, ota(slot + 1, 0));
    assert_eq!(sent.len(), 15);

    // The C-Plane leaves as its window opens, nine symbols before OTA.
    let (cplane, cplane_at) = &sent[0];
    let (cplane_ecpri, _) = decode_cplane(cplane);
    assert_eq!(cplane_ecpri.message_type, EcpriMessageType::RealTimeControl);
    assert_eq!(*cplane_at, ota(slot - 1, 5));

    // Each U-Plane symbol leaves six symbols before its own OTA symbol.
    for (symbol, (frame, at)) in sent[1..].iter().enumerate() {
        let (ecpri, radio_header, _) = decode_uplane(frame);
        assert_eq!(ecpri.message_type, EcpriMessageType::IqData);
        assert_eq!(ecpri.eaxc, Eaxc(0));
        assert_eq!(radio_header.start_symbol as usize, symbol);
        assert_eq!(ota(slot, symbol as u32) - *at, 6);
    }

    let transmitter = fx.ru.sector(0).unwrap().get_transmitter();
    assert_eq!(transmitter.frames_sent(), 15);
    assert_eq!(transmitter.dl_frame_pool().nof_entries(slot), 0);
}

#[test]
fn test_downlink_admitted_one_symbol_before_transmission_end() {
    let fx = single_sector();
    let slot = SlotPoint::new(1, 10, 8);
    // Four symbols before OTA, one more than the C-Plane end bound.
    let now = ota(slot - 1, 10);
    fx.timing.notify(now);

    fx.ru
        .get_downlink_plane_handler()
        .handle_dl_data(&ResourceGridContext { slot, sector: 0 }, &grid(0.5));
    assert!(fx.scheduler.late_dl.lock().is_empty());

    let sent = record_transmissions(&fx, now, ota(slot + 1, 0));
    assert_eq!(sent.len(), 15);
    assert_eq!(sent[0].1, ota(slot - 1, 11));
    for (symbol, (_, at)) in sent[1..].iter().enumerate() {
        let advance = ota(slot, symbol as u32) - *at;
        assert!((1..=6).contains(&advance), "symbol {} sent {} symbols ahead", symbol, advance);
    }

    let transmitter = fx.ru.sector(0).unwrap().get_transmitter();
    assert_eq!(transmitter.dl_window_checker().nof_late(), 0);
    assert_eq!(transmitter.dl_frame_pool().nof_entries(slot), 0);
}

#[test]
fn test_downlink_at_transmission_end_is_late() {
    for symbol in [11, 12] {
        let fx = single_sector();
        let slot = SlotPoint::new(1, 10, 8);
        fx.timing.notify(ota(slot - 1, symbol));

        fx.ru
            .get_downlink_plane_handler()
            .handle_dl_data(&ResourceGridContext { slot, sector: 0 }, &grid(0.5));

        let transmitter = fx.ru.sector(0).unwrap().get_transmitter();
        assert_eq!(transmitter.dl_frame_pool().nof_entries(slot), 0);
        assert_eq!(transmitter.dl_window_checker().nof_late(), 1);
        assert_eq!(*fx.scheduler.late_dl.lock(), vec![RuErrorContext { slot, sector: 0 }]);

        // Nothing is left behind to go out unreported.
        fx.timing.advance(ota(slot - 1, symbol), ota(slot + 1, 0));
        assert!(fx.gateway.frames.lock().is_empty());
    }
}

#[test]
fn test_uplink_request_boundary() {
    let slot = SlotPoint::new(1, 10, 8);
    let request = |fx: &Fixture| {
        fx.ru.get_uplink_plane_handler().handle_new_uplink_slot(
            &ResourceGridContext { slot, sector: 0 },
            ResourceGrid::new_shared(1, NOF_SYMBOLS as usize, NOF_SUBC),
        );
    };

    let admitted = single_sector();
    admitted.timing.notify(ota(slot - 1, 10));
    request(&admitted);
    admitted.timing.advance(ota(slot - 1, 10), ota(slot - 1, 11));
    assert_eq!(admitted.gateway.frames.lock().len(), 1);
    assert!(admitted.scheduler.late_ul.lock().is_empty());

    let late = single_sector();
    late.timing.notify(ota(slot - 1, 11));
    request(&late);
    late.timing.advance(ota(slot - 1, 11), ota(slot, 0));
    assert!(late.gateway.frames.lock().is_empty());
    assert_eq!(*late.scheduler.late_ul.lock(), vec![RuErrorContext { slot, sector: 0 }]);
}

#[test]
fn test_grid_longer_than_slot_without_tdd() {
    let fx = single_sector();
    let slot = SlotPoint::new(1, 10, 8);
    fx.timing.notify(ota(slot - 2, 0));

    let mut long_grid = ResourceGrid::new(1, 16, NOF_SUBC);
    for symbol in 0..16 {
        long_grid.fill_symbol(0, symbol, Complex32::new(0.5, -0.5));
    }
    fx.ru
        .get_downlink_plane_handler()
        .handle_dl_data(&ResourceGridContext { slot, sector: 0 }, &long_grid);

    let pool = fx.ru.sector(0).unwrap().get_transmitter().dl_frame_pool();
    let (_, section) = decode_cplane(&pool.frames(slot, control_key(0, DataDirection::Downlink))[0]);
    assert_eq!(section.nof_symbols, 14);
    let symbols: Vec<u8> = pool
        .frames(slot, user_key(0))
        .iter()
        .map(|frame| decode_uplane(frame).1.start_symbol)
        .collect();
    assert_eq!(symbols, (0..14).collect::<Vec<u8>>());
}

#[test]
fn test_uplink_request_and_reception() {
    let fx = single_sector();
    let slot = SlotPoint::new(1, 10, 8);
    let start = ota(slot - 2, 0);
    fx.timing.notify(start);

    let grid = ResourceGrid::new_shared(1, NOF_SYMBOLS as usize, NOF_SUBC);
    fx.ru
        .get_uplink_plane_handler()
        .handle_new_uplink_slot(&ResourceGridContext { slot, sector: 0 }, grid.clone());

    fx.timing.advance(start, ota(slot - 1, 11));
    let frames = fx.gateway.frames.lock().clone();
    assert_eq!(frames.len(), 1);
    let (ecpri, section) = decode_cplane(&frames[0]);
    assert_eq!(ecpri.eaxc, Eaxc(4));
    assert_eq!(section.radio_header.direction, DataDirection::Uplink);
    assert_eq!(section.nof_symbols, 14);

    fx.timing.notify(ota(slot, 1));
    let sector = fx.ru.sector(0).unwrap();
    sector.get_frame_notifier().on_new_frame(&uplink_frame(4, slot, 0, 0.5));

    let symbols = fx.uplink.symbols.lock().clone();
    assert_eq!(symbols.len(), 1);
    assert_eq!(symbols[0].0, UplinkRxSymbolContext { slot, sector: 0, symbol: 0 });
    assert!((symbols[0].1.re - 0.5).abs() < 1e-3);
    assert!((grid.lock().get(0, 0, NOF_SUBC - 1).re - 0.5).abs() < 1e-3);
    assert_eq!(sector.get_receiver().stats().frames_accepted, 1);
}

#[test]
fn test_late_uplink_request_reported() {
    let fx = single_sector();
    let slot = SlotPoint::new(1, 10, 8);
    fx.timing.notify(ota(slot, 0));

    fx.ru.get_uplink_plane_handler().handle_new_uplink_slot(
        &ResourceGridContext { slot, sector: 0 },
        ResourceGrid::new_shared(1, NOF_SYMBOLS as usize, NOF_SUBC),
    );

    assert_eq!(*fx.scheduler.late_ul.lock(), vec![RuErrorContext { slot, sector: 0 }]);
    assert_eq!(fx.ru.sector(0).unwrap().get_transmitter().ul_frame_pool().nof_entries(slot), 0);
}

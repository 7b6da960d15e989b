use super::{PlaylistItem, PlaylistSequencer};

/// Receives the item that just became current
pub trait SongObserver<T> {
    fn song_started(&mut self, item: &T);
}

impl<T, F: FnMut(&T)> SongObserver<T> for F {
    fn song_started(&mut self, item: &T) {
        self(item)
    }
}

/// Play queue in front of a playlist
///
/// Each `next` takes from the queue if it holds anything, checked afresh on
/// every call, and otherwise advances the playlist. Items taken from the
/// queue are removed from it.
pub struct PlaylistMux<T, O> {
    queue: PlaylistSequencer<T>,
    playlist: PlaylistSequencer<T>,
    observer: O,
    current: Option<T>,
}

impl<T: PlaylistItem, O: SongObserver<T>> PlaylistMux<T, O> {
    pub fn new(observer: O, queue: PlaylistSequencer<T>, playlist: PlaylistSequencer<T>) -> Self {
        Self {
            queue,
            playlist,
            observer,
            current: None,
        }
    }

    pub fn queue(&self) -> &PlaylistSequencer<T> {
        &self.queue
    }

    pub fn queue_mut(&mut self) -> &mut PlaylistSequencer<T> {
        &mut self.queue
    }

    pub fn playlist(&self) -> &PlaylistSequencer<T> {
        &self.playlist
    }

    pub fn playlist_mut(&mut self) -> &mut PlaylistSequencer<T> {
        &mut self.playlist
    }

    pub fn observer(&self) -> &O {
        &self.observer
    }

    pub fn current(&self) -> Option<&T> {
        self.current.as_ref()
    }

    /// Advance the merged stream
    pub fn next(&mut self) -> Option<&T> {
        let item = match self.take_queued() {
            Some(item) => Some(item),
            None => self.playlist.next().cloned(),
        };
        self.set_current(item)
    }

    /// Remove and return the queue's next item
    ///
    /// Every queued item is still unplayed, so a queue cursor left on its
    /// last item (e.g. by `queue_mut().go_to`) starts over from the front.
    fn take_queued(&mut self) -> Option<T> {
        if self.queue.is_empty() {
            return None;
        }
        let taken = match self.queue.next() {
            Some(item) => Some(item.clone()),
            None => {
                self.queue.go_to(None);
                self.queue.next().cloned()
            }
        };
        if let Some(item) = &taken {
            self.queue.remove(item);
        }
        taken
    }

    /// Step back in the playlist; queued items already played are gone
    pub fn previous(&mut self) -> Option<&T> {
        let item = self.playlist.previous().cloned();
        self.set_current(item)
    }

    /// Jump to an item in the playlist
    pub fn go_to(&mut self, item: Option<&T>) -> bool {
        if !self.playlist.go_to(item) {
            return false;
        }
        let item = self.playlist.current().cloned();
        self.set_current(item);
        true
    }

    fn set_current(&mut self, item: Option<T>) -> Option<&T> {
        self.current = item;
        if let Some(song) = &self.current {
            log::debug!("Song started");
            self.observer.song_started(song);
        }
        self.current.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Watcher {
        started: Vec<u32>,
    }

    impl SongObserver<u32> for Watcher {
        fn song_started(&mut self, item: &u32) {
            self.started.push(*item);
        }
    }

    fn mux() -> PlaylistMux<u32, Watcher> {
        let mux = PlaylistMux::new(
            Watcher { started: Vec::new() },
            PlaylistSequencer::with_seed(1),
            PlaylistSequencer::with_seed(2),
        );
        assert_eq!(mux.current(), None);
        mux
    }

    fn take(mux: &mut PlaylistMux<u32, Watcher>, n: usize) -> Vec<Option<u32>> {
        (0..n).map(|_| mux.next().copied()).collect()
    }

    fn some(range: std::ops::Range<u32>) -> Vec<Option<u32>> {
        range.map(Some).collect()
    }

    #[test]
    fn test_only_playlist() {
        let mut mux = mux();
        mux.playlist_mut().set((0..10).collect());
        assert_eq!(take(&mut mux, 10), some(0..10));
        assert_eq!(mux.next(), None);
        assert_eq!(mux.current(), None);
    }

    #[test]
    fn test_only_queue() {
        let mut mux = mux();
        mux.queue_mut().set((0..10).collect());
        assert_eq!(take(&mut mux, 10), some(0..10));
        assert_eq!(mux.next(), None);
        assert!(mux.queue().is_empty());
    }

    #[test]
    fn test_mixed() {
        let mut mux = mux();
        mux.queue_mut().set((0..5).collect());
        mux.playlist_mut().set((5..10).collect());
        assert_eq!(take(&mut mux, 10), some(0..10));
        assert_eq!(mux.next(), None);
    }

    #[test]
    fn test_halfway() {
        let mut mux = mux();
        mux.playlist_mut().set((0..10).collect());
        let mut songs = take(&mut mux, 5);
        mux.queue_mut().set((100..105).collect());
        songs.extend(take(&mut mux, 10));
        let expected: Vec<Option<u32>> = (0..5).chain(100..105).chain(5..10).map(Some).collect();
        assert_eq!(songs, expected);
        assert_eq!(mux.next(), None);
    }

    #[test]
    fn test_removal() {
        let mut mux = mux();
        mux.playlist_mut().set((0..5).collect());
        mux.queue_mut().set((10..15).collect());
        let mut songs = take(&mut mux, 3);
        assert_eq!(mux.queue_mut().remove(&14), Some(14));
        assert_eq!(mux.queue_mut().remove(&13), Some(13));
        songs.extend(take(&mut mux, 5));
        let expected: Vec<Option<u32>> = (10..13).chain(0..5).map(Some).collect();
        assert_eq!(songs, expected);
    }

    #[test]
    fn test_queue_cursor_on_last_item() {
        let mut mux = mux();
        mux.playlist_mut().set((0..3).collect());
        mux.queue_mut().set(vec![10, 11]);
        assert!(mux.queue_mut().go_to(Some(&11)));

        assert_eq!(take(&mut mux, 5), vec![Some(10), Some(11), Some(0), Some(1), Some(2)]);
        assert!(mux.queue().is_empty());
        assert_eq!(mux.next(), None);
    }

    #[test]
    fn test_observer_sees_every_start() {
        let mut mux = mux();
        mux.queue_mut().set(vec![7]);
        mux.playlist_mut().set(vec![1, 2]);
        take(&mut mux, 4);
        assert_eq!(mux.observer().started, vec![7, 1, 2]);

        assert_eq!(mux.previous(), Some(&1));
        assert_eq!(mux.observer().started, vec![7, 1, 2, 1]);
    }

    #[test]
    fn test_closure_observer() {
        let mut count = 0;
        {
            let mut mux = PlaylistMux::new(
                |_: &u32| count += 1,
                PlaylistSequencer::new(),
                PlaylistSequencer::new(),
            );
            mux.playlist_mut().set(vec![1, 2, 3]);
            assert!(mux.go_to(Some(&2)));
            assert_eq!(mux.next(), Some(&3));
            assert!(!mux.go_to(Some(&9)));
        }
        assert_eq!(count, 2);
    }
}

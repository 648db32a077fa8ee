//! Completion handles for asynchronous client operations
//!
//! Each operation is represented by a `Promise`/`Future` pair. The completion
//! thread fulfils the promise exactly once, which consumes it. The future
//! caches the outcome so it can be inspected any number of times.

use std::fmt;

use crossbeam_channel::{bounded, Receiver, Sender, TryRecvError};

use super::ClientError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    Ok,
    GenericException,
    ServerMemoryExhausted,
    NoSuchId
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

pub struct Promise<T> {
    sender: Sender<Result<T, ErrorCode>>
}

impl<T> Promise<T> {
    pub fn fulfill(self, value: T) {
        let _ = self.sender.send(Ok(value));
    }

    pub fn fail(self, code: ErrorCode) {
        let code = if code == ErrorCode::Ok { ErrorCode::GenericException } else { code };
        let _ = self.sender.send(Err(code));
    }

    pub fn complete(self, result: Result<T, ErrorCode>) {
        match result {
            Ok(v) => self.fulfill(v),
            Err(c) => self.fail(c)
        }
    }
}

pub struct Future<T> {
    receiver: Option<Receiver<Result<T, ErrorCode>>>,
    outcome: Option<Result<T, ErrorCode>>
}

/// Creates a linked promise and future
pub fn pair<T>() -> (Promise<T>, Future<T>) {
    let (sender, receiver) = bounded(1);
    (Promise { sender }, Future { receiver: Some(receiver), outcome: None })
}

impl<T: Clone> Future<T> {
    /// A future that is already fulfilled
    pub fn ready(result: Result<T, ErrorCode>) -> Future<T> {
        Future {
            receiver: None,
            outcome: Some(result)
        }
    }

    /// Blocks until the outcome is available
    pub fn wait(&mut self) {
        if self.outcome.is_some() {
            return;
        }
        let outcome = match &self.receiver {
            Some(r) => r.recv().unwrap_or(Err(ErrorCode::GenericException)),
            None => Err(ErrorCode::GenericException)
        };
        self.settle(outcome);
    }

    /// Returns true once the outcome is available. Never blocks.
    pub fn try_wait(&mut self) -> bool {
        if self.outcome.is_some() {
            return true;
        }
        let polled = match &self.receiver {
            Some(r) => match r.try_recv() {
                Ok(o) => Some(o),
                Err(TryRecvError::Empty) => None,
                Err(TryRecvError::Disconnected) => Some(Err(ErrorCode::GenericException))
            },
            None => Some(Err(ErrorCode::GenericException))
        };
        match polled {
            Some(o) => {
                self.settle(o);
                true
            },
            None => false
        }
    }

    fn settle(&mut self, outcome: Result<T, ErrorCode>) {
        self.outcome = Some(outcome);
        self.receiver = None;
    }

    pub fn is_ready(&self) -> bool {
        self.outcome.is_some()
    }

    /// `Ok` until a failure has been observed
    pub fn error_code(&self) -> ErrorCode {
        match &self.outcome {
            Some(Err(c)) => *c,
            _ => ErrorCode::Ok
        }
    }

    /// Waits, then returns the result or the typed error
    pub fn get(&mut self) -> Result<T, ClientError> {
        self.wait();
        match &self.outcome {
            Some(Ok(v)) => Ok(v.clone()),
            Some(Err(c)) => Err(ClientError::from(*c)),
            None => Err(ClientError::GenericServerException)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn fulfilled_from_another_thread() {
        let (p, mut f) = pair::<u64>();
        assert!(!f.try_wait());
        let t = thread::spawn(move || p.fulfill(77));
        assert_eq!(f.get().unwrap(), 77);
        t.join().unwrap();
    }

    #[test]
    fn get_twice() {
        let (p, mut f) = pair::<Vec<u8>>();
        p.fulfill(b"abc".to_vec());
        assert_eq!(f.get().unwrap(), b"abc".to_vec());
        assert_eq!(f.get().unwrap(), b"abc".to_vec());
        assert!(f.try_wait());
        assert_eq!(f.error_code(), ErrorCode::Ok);
    }

    #[test]
    fn failure_codes() {
        let (p, mut f) = pair::<bool>();
        p.fail(ErrorCode::NoSuchId);
        match f.get() {
            Err(ClientError::NoSuchId) => (),
            other => panic!("unexpected {:?}", other)
        }
        assert_eq!(f.error_code(), ErrorCode::NoSuchId);

        let mut f = Future::<bool>::ready(Err(ErrorCode::ServerMemoryExhausted));
        assert!(f.is_ready());
        match f.get() {
            Err(ClientError::ServerMemoryExhausted) => (),
            other => panic!("unexpected {:?}", other)
        }
    }

    #[test]
    fn dropped_promise() {
        let (p, mut f) = pair::<bool>();
        drop(p);
        assert!(f.try_wait());
        assert_eq!(f.error_code(), ErrorCode::GenericException);
        match f.get() {
            Err(ClientError::GenericServerException) => (),
            other => panic!("unexpected {:?}", other)
        }
    }
}
